use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::AppError;
use crate::settings;

pub const DB_FILE: &str = "margemforte.sqlite";
const APP_DIR_NAME: &str = "MargemForte";

const PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

pub struct Db {
  pub conn: Mutex<Connection>,
  pub db_path: PathBuf,
}

/// Data directory: `MARGEMFORTE_DATA_DIR`, then portable mode, then the
/// platform's local data dir.
pub fn resolve_app_dir() -> Result<PathBuf, AppError> {
  if let Some(dir) = std::env::var_os("MARGEMFORTE_DATA_DIR").filter(|value| !value.is_empty()) {
    return Ok(PathBuf::from(dir));
  }

  if let Some(portable) = resolve_portable_dir()? {
    return Ok(portable);
  }

  let base = dirs_next::data_local_dir()
    .ok_or_else(|| AppError::new("PATH", "Diretório de dados não encontrado"))?;
  Ok(base.join(APP_DIR_NAME))
}

pub fn init_db(app_dir: &Path) -> Result<Db, AppError> {
  fs::create_dir_all(app_dir)?;
  let db_path = app_dir.join(DB_FILE);
  let conn = open_connection(&db_path)?;
  info!(path = %db_path.display(), "database ready");

  Ok(Db {
    conn: Mutex::new(conn),
    db_path,
  })
}

/// Throwaway database for tests and one-off previews.
pub fn init_in_memory() -> Result<Db, AppError> {
  let mut conn = Connection::open_in_memory()?;
  prepare(&mut conn)?;
  Ok(Db {
    conn: Mutex::new(conn),
    db_path: PathBuf::from(":memory:"),
  })
}

pub fn with_conn<T>(db: &Db, f: impl FnOnce(&mut Connection) -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  f(&mut guard)
}

/// Closes the live connection, lets `replace` swap the file underneath, then
/// reopens it. The old connection is gone before `replace` runs so no WAL
/// content can be written back over the new file.
pub fn replace_database(db: &Db, replace: impl FnOnce(&Path) -> Result<(), AppError>) -> Result<(), AppError> {
  let mut guard = db.conn.lock()?;
  checkpoint(&guard)?;
  let old = std::mem::replace(&mut *guard, Connection::open_in_memory()?);
  old.close().map_err(|(_, err)| AppError::from(err))?;

  for suffix in ["-wal", "-shm"] {
    let side_file = PathBuf::from(format!("{}{suffix}", db.db_path.display()));
    if side_file.exists() {
      fs::remove_file(&side_file)?;
    }
  }

  let outcome = replace(&db.db_path);
  // Reopen even when the swap failed, the old file is still in place then.
  *guard = open_connection(&db.db_path)?;
  outcome
}

pub fn checkpoint(conn: &Connection) -> Result<(), AppError> {
  conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
  Ok(())
}

fn open_connection(db_path: &Path) -> Result<Connection, AppError> {
  let mut conn = Connection::open(db_path)?;
  conn.execute_batch(PRAGMAS)?;
  conn.busy_timeout(Duration::from_secs(5))?;
  prepare(&mut conn)?;
  Ok(conn)
}

fn prepare(conn: &mut Connection) -> Result<(), AppError> {
  run_migrations(conn)?;
  settings::ensure_defaults(conn)?;
  Ok(())
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
  )?;

  apply_migration(conn, "001_init", include_str!("../migrations/001_init.sql"))?;
  Ok(())
}

fn apply_migration(conn: &mut Connection, version: &str, sql: &str) -> Result<(), AppError> {
  let exists: i64 = conn.query_row(
    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
    params![version],
    |row| row.get(0),
  )?;
  if exists > 0 {
    debug!(version, "migration already applied");
    return Ok(());
  }

  let tx = conn.transaction()?;
  tx.execute_batch(sql)?;
  tx.execute(
    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
    params![version, Utc::now().to_rfc3339()],
  )?;
  tx.commit()?;
  info!(version, "migration applied");
  Ok(())
}

fn resolve_portable_dir() -> Result<Option<PathBuf>, AppError> {
  let env_enabled = std::env::var("MARGEMFORTE_PORTABLE")
    .ok()
    .map(|value| {
      let value = value.to_ascii_lowercase();
      value == "1" || value == "true" || value == "yes"
    })
    .unwrap_or(false);

  let exe_dir = std::env::current_exe()
    .ok()
    .and_then(|path| path.parent().map(|parent| parent.to_path_buf()));

  if let Some(exe_dir) = exe_dir {
    let flag = exe_dir.join("portable.flag");
    let data_dir = exe_dir.join("data");
    if env_enabled || flag.exists() || data_dir.exists() {
      fs::create_dir_all(&data_dir)?;
      return Ok(Some(data_dir));
    }
  }

  Ok(None)
}
