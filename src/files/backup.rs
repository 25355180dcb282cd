use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};
use tracing::{info, warn};

use crate::error::AppError;

const DB_ENTRY: &str = "db.sqlite";
const JSON_ENTRY: &str = "calculations.json";

/// Zips the database file next to a JSON copy of every calculation. The
/// caller checkpoints the WAL first so the file on disk is complete.
pub fn create_backup(
  app_dir: &Path,
  db_path: &Path,
  calculations_json: &str,
  output_path: Option<PathBuf>,
) -> Result<PathBuf, AppError> {
  let path = match output_path {
    Some(path) => path,
    None => {
      let stamp = Utc::now().format("%Y%m%d_%H%M%S");
      app_dir.join("Backups").join(format!("backup_{stamp}.zip"))
    }
  };

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }

  let file = File::create(&path)?;
  let mut zip = ZipWriter::new(file);
  let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

  zip.start_file(DB_ENTRY, options)?;
  let mut buffer = Vec::new();
  File::open(db_path)?.read_to_end(&mut buffer)?;
  zip.write_all(&buffer)?;

  zip.start_file(JSON_ENTRY, options)?;
  zip.write_all(calculations_json.as_bytes())?;

  zip.finish()?;
  info!(path = %path.display(), bytes = buffer.len(), "backup written");
  Ok(path)
}

/// Copies the database out of `archive_path` over `db_path`, keeping the
/// current file as `.bak`. The database connection must be closed.
pub fn restore_backup(archive_path: &Path, db_path: &Path) -> Result<(), AppError> {
  let file = File::open(archive_path)?;
  let mut archive = ZipArchive::new(file)?;
  let mut entry = match archive.by_name(DB_ENTRY) {
    Ok(entry) => entry,
    Err(zip::result::ZipError::FileNotFound) => {
      return Err(AppError::new("BACKUP_INVALID", "O arquivo de backup não contém um banco de dados"));
    }
    Err(err) => return Err(err.into()),
  };

  let mut data = Vec::new();
  entry.read_to_end(&mut data)?;
  if !data.starts_with(b"SQLite format 3\0") {
    return Err(AppError::new("BACKUP_INVALID", "O banco de dados do backup está corrompido"));
  }

  if db_path.exists() {
    let backup_path = db_path.with_extension("bak");
    fs::copy(db_path, &backup_path)?;
    warn!(path = %backup_path.display(), "previous database kept");
  }
  fs::write(db_path, &data)?;
  info!(archive = %archive_path.display(), "backup restored");
  Ok(())
}
