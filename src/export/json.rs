use rusqlite::Transaction;
use tracing::{info, warn};

use crate::calculations;
use crate::error::AppError;
use crate::models::SavedCalculation;

/// Pretty-printed array; an unreachable minimum price is written as the
/// string `"Infinity"`.
pub fn calculations_json(calculations: &[SavedCalculation]) -> Result<String, AppError> {
  Ok(serde_json::to_string_pretty(calculations)?)
}

pub fn parse_calculations(json: &str) -> Result<Vec<SavedCalculation>, AppError> {
  Ok(serde_json::from_str(json)?)
}

/// Loads a JSON export back inside the caller's transaction. Entries whose id
/// already exists are skipped; the result snapshot of every imported entry is
/// recomputed from its inputs.
pub fn import_calculations(tx: &Transaction<'_>, json: &str) -> Result<usize, AppError> {
  let incoming = parse_calculations(json)?;
  let mut imported = 0;
  // Exports are newest first; inserting oldest first keeps ties in order.
  for calc in incoming.into_iter().rev() {
    if calculations::get_calculation(tx, &calc.id)?.is_some() {
      warn!(id = %calc.id, "skipping calculation that already exists");
      continue;
    }
    let input = calculations::validate_input(calc.inputs())?;
    let snapshot = calculations::build_snapshot(calc.id, input, calc.created_at, calc.updated_at);
    calculations::insert_calculation(tx, &snapshot)?;
    imported += 1;
  }
  info!(imported, "calculations imported");
  Ok(imported)
}
