use std::fs;
use std::path::{Path, PathBuf};

use crate::audit::log::{self, AuditEvent, ENTITY_CALCULATION, ENTITY_DATABASE, ENTITY_SETTINGS};
use crate::calculations;
use crate::db;
use crate::domain::margin::{calculate_margin, MarginInput, MarginResult};
use crate::domain::templates::{self, TaxRegime, Template};
use crate::error::AppError;
use crate::export::{csv, excel, json, text};
use crate::files::backup;
use crate::models::*;
use crate::settings;
use crate::AppState;

pub fn calculate(input: &MarginInput) -> MarginResult {
  calculate_margin(input)
}

/// Result for a not yet saved calculation, straight from its inputs.
pub fn preview(input: &NewCalculation) -> MarginResult {
  calculate_margin(&input.margin_input())
}

pub fn get_settings(state: &AppState) -> Result<Settings, AppError> {
  db::with_conn(&state.db, |conn| settings::get_settings(conn))
}

pub fn update_settings(state: &AppState, settings_input: Settings, actor: Option<&str>) -> Result<Settings, AppError> {
  db::with_conn(&state.db, |conn| {
    let tx = conn.transaction()?;
    settings::update_settings(&tx, &settings_input)?;
    log::append_audit(
      &tx,
      AuditEvent::new("UPDATE_SETTINGS", ENTITY_SETTINGS).actor(actor),
      &settings_input,
    )?;
    tx.commit()?;
    Ok(settings_input)
  })
}

pub fn list_templates() -> &'static [Template] {
  templates::TEMPLATES
}

pub fn list_tax_regimes() -> &'static [TaxRegime] {
  templates::TAX_REGIMES
}

pub fn save_calculation(state: &AppState, input: NewCalculation, actor: Option<&str>) -> Result<SavedCalculation, AppError> {
  db::with_conn(&state.db, |conn| {
    let tx = conn.transaction()?;
    let calc = calculations::save_calculation(&tx, input)?;
    log::append_audit(
      &tx,
      AuditEvent::new("SAVE", ENTITY_CALCULATION).actor(actor).entity(&calc.id),
      &calc,
    )?;
    tx.commit()?;
    Ok(calc)
  })
}

pub fn update_calculation(
  state: &AppState,
  id: &str,
  update: CalculationUpdate,
  actor: Option<&str>,
) -> Result<SavedCalculation, AppError> {
  db::with_conn(&state.db, |conn| {
    let tx = conn.transaction()?;
    let payload = serde_json::to_value(&update)?;
    let calc = calculations::update_calculation(&tx, id, update)?.ok_or_else(|| AppError::not_found(id))?;
    log::append_audit(
      &tx,
      AuditEvent::new("UPDATE", ENTITY_CALCULATION).actor(actor).entity(id),
      &payload,
    )?;
    tx.commit()?;
    Ok(calc)
  })
}

pub fn get_calculation(state: &AppState, id: &str) -> Result<Option<SavedCalculation>, AppError> {
  db::with_conn(&state.db, |conn| calculations::get_calculation(conn, id))
}

pub fn list_calculations(state: &AppState, filter: &CalculationFilter) -> Result<Paginated<SavedCalculation>, AppError> {
  db::with_conn(&state.db, |conn| calculations::list_calculations(conn, filter))
}

pub fn delete_calculation(state: &AppState, id: &str, actor: Option<&str>) -> Result<bool, AppError> {
  db::with_conn(&state.db, |conn| {
    let tx = conn.transaction()?;
    let removed = calculations::delete_calculation(&tx, id)?;
    if removed {
      log::append_audit(
        &tx,
        AuditEvent::new("DELETE", ENTITY_CALCULATION).actor(actor).entity(id),
        &serde_json::json!({ "id": id }),
      )?;
    }
    tx.commit()?;
    Ok(removed)
  })
}

pub fn export_json(state: &AppState) -> Result<String, AppError> {
  db::with_conn(&state.db, |conn| json::calculations_json(&calculations::all_calculations(conn)?))
}

pub fn import_json(state: &AppState, content: &str, actor: Option<&str>) -> Result<usize, AppError> {
  db::with_conn(&state.db, |conn| {
    let tx = conn.transaction()?;
    let imported = json::import_calculations(&tx, content)?;
    log::append_audit(
      &tx,
      AuditEvent::new("IMPORT", ENTITY_DATABASE).actor(actor),
      &serde_json::json!({ "imported": imported }),
    )?;
    tx.commit()?;
    Ok(imported)
  })
}

pub fn export_csv(state: &AppState) -> Result<String, AppError> {
  db::with_conn(&state.db, |conn| Ok(csv::calculations_csv(&calculations::all_calculations(conn)?)))
}

pub fn export_csv_file(state: &AppState, output_path: &Path) -> Result<(), AppError> {
  let all = db::with_conn(&state.db, |conn| calculations::all_calculations(conn))?;
  if let Some(parent) = output_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }
  csv::export_csv(&all, output_path)
}

pub fn export_text(state: &AppState, id: &str) -> Result<Option<String>, AppError> {
  Ok(get_calculation(state, id)?.map(|calc| text::calculation_text(&calc)))
}

pub fn export_xlsx(state: &AppState, output_path: &Path) -> Result<(), AppError> {
  let all = db::with_conn(&state.db, |conn| calculations::all_calculations(conn))?;
  if let Some(parent) = output_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }
  excel::export_xlsx(&all, output_path)
}

pub fn create_backup(state: &AppState, output_path: Option<PathBuf>, actor: Option<&str>) -> Result<PathBuf, AppError> {
  db::with_conn(&state.db, |conn| {
    db::checkpoint(conn)?;
    let snapshot = json::calculations_json(&calculations::all_calculations(conn)?)?;
    let path = backup::create_backup(&state.app_dir, &state.db.db_path, &snapshot, output_path)?;
    log::append_audit(
      conn,
      AuditEvent::new("BACKUP", ENTITY_DATABASE).actor(actor),
      &serde_json::json!({ "path": path.display().to_string() }),
    )?;
    Ok(path)
  })
}

pub fn restore_backup(state: &AppState, archive_path: &Path, actor: Option<&str>) -> Result<(), AppError> {
  db::replace_database(&state.db, |db_path| backup::restore_backup(archive_path, db_path))?;
  db::with_conn(&state.db, |conn| {
    log::append_audit(
      conn,
      AuditEvent::new("RESTORE", ENTITY_DATABASE).actor(actor),
      &serde_json::json!({ "archive": archive_path.display().to_string() }),
    )
  })
}

pub fn list_audit_log(state: &AppState, limit: i64) -> Result<Vec<AuditLogEntry>, AppError> {
  db::with_conn(&state.db, |conn| log::list_audit_log(conn, limit))
}
