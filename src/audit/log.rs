use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::AppError;
use crate::models::AuditLogEntry;

pub const ENTITY_CALCULATION: &str = "CALCULATION";
pub const ENTITY_SETTINGS: &str = "SETTINGS";
pub const ENTITY_DATABASE: &str = "DATABASE";

pub struct AuditEvent<'a> {
  pub actor: Option<&'a str>,
  pub action: &'a str,
  pub entity_type: &'a str,
  pub entity_id: Option<&'a str>,
}

impl<'a> AuditEvent<'a> {
  pub fn new(action: &'a str, entity_type: &'a str) -> Self {
    Self {
      actor: None,
      action,
      entity_type,
      entity_id: None,
    }
  }

  pub fn actor(mut self, actor: Option<&'a str>) -> Self {
    self.actor = actor;
    self
  }

  pub fn entity(mut self, id: &'a str) -> Self {
    self.entity_id = Some(id);
    self
  }
}

pub fn append_audit(conn: &Connection, event: AuditEvent<'_>, payload: &impl Serialize) -> Result<(), AppError> {
  let payload_json = serde_json::to_string(payload)?;
  conn.execute(
    "INSERT INTO audit_log (ts, actor, action, entity_type, entity_id, payload_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      Utc::now().to_rfc3339(),
      event.actor,
      event.action,
      event.entity_type,
      event.entity_id,
      payload_json
    ],
  )?;
  Ok(())
}

pub fn list_audit_log(conn: &Connection, limit: i64) -> Result<Vec<AuditLogEntry>, AppError> {
  let mut stmt = conn.prepare(
    "SELECT id, ts, actor, action, entity_type, entity_id, payload_json FROM audit_log ORDER BY id DESC LIMIT ?1",
  )?;
  let rows = stmt.query_map(params![limit.max(0)], |row| {
    Ok(AuditLogEntry {
      id: row.get(0)?,
      ts: row.get(1)?,
      actor: row.get(2)?,
      action: row.get(3)?,
      entity_type: row.get(4)?,
      entity_id: row.get(5)?,
      payload_json: row.get(6)?,
    })
  })?;

  let mut entries = Vec::new();
  for row in rows {
    entries.push(row?);
  }
  Ok(entries)
}
