//! Saved calculations.
//!
//! A saved calculation keeps the inputs exactly as entered plus a snapshot of
//! the engine's result at the time of the last write. The snapshot is always
//! recomputed here, never taken from the caller.

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::domain::cost_items::CostItem;
use crate::domain::margin::{calculate_margin, MarginStatus};
use crate::domain::validation;
use crate::error::AppError;
use crate::models::{CalculationFilter, CalculationUpdate, NewCalculation, Paginated, SavedCalculation};

const SELECT_COLUMNS: &str = "id, name, template_id, cost_items_json, service_value, desired_margin, tax_rate, \
  fixed_cost_monthly, jobs_per_month, total_cost, minimum_price, actual_margin, max_discount, status, created_at, updated_at";

pub fn now_timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Runs the engine over `input` and packs inputs and result together.
pub fn build_snapshot(id: String, input: NewCalculation, created_at: String, updated_at: String) -> SavedCalculation {
  let result = calculate_margin(&input.margin_input());
  SavedCalculation {
    id,
    name: input.name,
    template_id: input.template_id,
    cost_items: input.cost_items,
    service_value: input.service_value,
    desired_margin: input.desired_margin,
    tax_rate: input.tax_rate,
    fixed_cost_monthly: input.fixed_cost_monthly,
    jobs_per_month: input.jobs_per_month,
    total_cost: result.total_cost,
    minimum_price: result.minimum_price,
    actual_margin: result.net_margin,
    max_discount: result.max_discount,
    status: result.status,
    created_at,
    updated_at,
  }
}

pub fn validate_input(mut input: NewCalculation) -> Result<NewCalculation, AppError> {
  input.name = validation::ensure_name(&input.name)?;
  validation::ensure_template(&input.template_id)?;
  validation::ensure_cost_items(&input.cost_items)?;
  validation::ensure_amount("Valor do serviço", input.service_value)?;
  validation::ensure_amount("Margem desejada", input.desired_margin)?;
  validation::ensure_amount("Imposto", input.tax_rate)?;
  validation::ensure_amount("Custos fixos", input.fixed_cost_monthly)?;
  validation::ensure_amount("Serviços por mês", input.jobs_per_month)?;
  Ok(input)
}

pub fn save_calculation(conn: &Connection, input: NewCalculation) -> Result<SavedCalculation, AppError> {
  let input = validate_input(input)?;
  let now = now_timestamp();
  let calc = build_snapshot(uuid::Uuid::new_v4().to_string(), input, now.clone(), now);
  insert_calculation(conn, &calc)?;
  info!(id = %calc.id, name = %calc.name, status = calc.status.as_str(), "calculation saved");
  Ok(calc)
}

pub fn insert_calculation(conn: &Connection, calc: &SavedCalculation) -> Result<(), AppError> {
  conn.execute(
    "INSERT INTO calculations (id, name, name_search, template_id, cost_items_json, service_value, desired_margin, tax_rate,
       fixed_cost_monthly, jobs_per_month, total_cost, minimum_price, actual_margin, max_discount, status, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    params![
      calc.id,
      calc.name,
      calc.name.to_lowercase(),
      calc.template_id,
      serde_json::to_string(&calc.cost_items)?,
      calc.service_value,
      calc.desired_margin,
      calc.tax_rate,
      calc.fixed_cost_monthly,
      calc.jobs_per_month,
      calc.total_cost,
      finite(calc.minimum_price),
      calc.actual_margin,
      calc.max_discount,
      calc.status.as_str(),
      calc.created_at,
      calc.updated_at
    ],
  )?;
  Ok(())
}

pub fn update_calculation(
  conn: &Connection,
  id: &str,
  update: CalculationUpdate,
) -> Result<Option<SavedCalculation>, AppError> {
  let Some(existing) = get_calculation(conn, id)? else {
    debug!(id, "update for unknown calculation");
    return Ok(None);
  };

  let mut input = existing.inputs();
  if let Some(name) = update.name {
    input.name = name;
  }
  if let Some(template_id) = update.template_id {
    input.template_id = template_id;
  }
  if let Some(cost_items) = update.cost_items {
    input.cost_items = cost_items;
  }
  input.service_value = update.service_value.unwrap_or(input.service_value);
  input.desired_margin = update.desired_margin.unwrap_or(input.desired_margin);
  input.tax_rate = update.tax_rate.unwrap_or(input.tax_rate);
  input.fixed_cost_monthly = update.fixed_cost_monthly.unwrap_or(input.fixed_cost_monthly);
  input.jobs_per_month = update.jobs_per_month.unwrap_or(input.jobs_per_month);

  let input = validate_input(input)?;
  let calc = build_snapshot(existing.id, input, existing.created_at, now_timestamp());

  conn.execute(
    "UPDATE calculations SET name = ?1, name_search = ?2, template_id = ?3, cost_items_json = ?4, service_value = ?5,
       desired_margin = ?6, tax_rate = ?7, fixed_cost_monthly = ?8, jobs_per_month = ?9, total_cost = ?10,
       minimum_price = ?11, actual_margin = ?12, max_discount = ?13, status = ?14, updated_at = ?15
     WHERE id = ?16",
    params![
      calc.name,
      calc.name.to_lowercase(),
      calc.template_id,
      serde_json::to_string(&calc.cost_items)?,
      calc.service_value,
      calc.desired_margin,
      calc.tax_rate,
      calc.fixed_cost_monthly,
      calc.jobs_per_month,
      calc.total_cost,
      finite(calc.minimum_price),
      calc.actual_margin,
      calc.max_discount,
      calc.status.as_str(),
      calc.updated_at,
      calc.id
    ],
  )?;
  info!(id = %calc.id, "calculation updated");
  Ok(Some(calc))
}

pub fn get_calculation(conn: &Connection, id: &str) -> Result<Option<SavedCalculation>, AppError> {
  let calc = conn
    .query_row(
      &format!("SELECT {SELECT_COLUMNS} FROM calculations WHERE id = ?1"),
      params![id],
      map_row,
    )
    .optional()?;
  Ok(calc)
}

/// Newest first. `search` matches a case-insensitive substring of the name;
/// paging needs both `page` (1-based) and `page_size` to be positive, and
/// `total` always counts every match.
pub fn list_calculations(conn: &Connection, filter: &CalculationFilter) -> Result<Paginated<SavedCalculation>, AppError> {
  let search = filter
    .search
    .as_deref()
    .filter(|value| !value.is_empty())
    .map(str::to_lowercase);

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM calculations WHERE (?1 IS NULL OR instr(name_search, ?1) > 0)",
    params![search],
    |row| row.get(0),
  )?;

  let (limit, offset) = match (filter.page, filter.page_size) {
    (Some(page), Some(size)) if page > 0 && size > 0 => match (page - 1).checked_mul(size) {
      Some(offset) => (size, offset),
      // Past any row SQLite could hold.
      None => return Ok(Paginated { total, items: Vec::new() }),
    },
    _ => (-1, 0),
  };

  let mut stmt = conn.prepare(&format!(
    "SELECT {SELECT_COLUMNS} FROM calculations
     WHERE (?1 IS NULL OR instr(name_search, ?1) > 0)
     ORDER BY created_at DESC, rowid DESC
     LIMIT ?2 OFFSET ?3"
  ))?;
  let rows = stmt.query_map(params![search, limit, offset], map_row)?;

  let mut items = Vec::new();
  for row in rows {
    items.push(row?);
  }
  debug!(total, returned = items.len(), "calculations listed");
  Ok(Paginated { total, items })
}

pub fn all_calculations(conn: &Connection) -> Result<Vec<SavedCalculation>, AppError> {
  Ok(list_calculations(conn, &CalculationFilter::default())?.items)
}

pub fn delete_calculation(conn: &Connection, id: &str) -> Result<bool, AppError> {
  let removed = conn.execute("DELETE FROM calculations WHERE id = ?1", params![id])?;
  if removed > 0 {
    info!(id, "calculation deleted");
  }
  Ok(removed > 0)
}

fn finite(value: f64) -> Option<f64> {
  value.is_finite().then_some(value)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SavedCalculation> {
  let cost_items_json: String = row.get(3)?;
  let cost_items: Vec<CostItem> = serde_json::from_str(&cost_items_json)
    .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
  let status: String = row.get(13)?;
  let status = MarginStatus::parse(&status).ok_or_else(|| {
    rusqlite::Error::FromSqlConversionFailure(13, Type::Text, format!("unknown status {status}").into())
  })?;

  Ok(SavedCalculation {
    id: row.get(0)?,
    name: row.get(1)?,
    template_id: row.get(2)?,
    cost_items,
    service_value: row.get(4)?,
    desired_margin: row.get(5)?,
    tax_rate: row.get(6)?,
    fixed_cost_monthly: row.get(7)?,
    jobs_per_month: row.get(8)?,
    total_cost: row.get(9)?,
    minimum_price: row.get::<_, Option<f64>>(10)?.unwrap_or(f64::INFINITY),
    actual_margin: row.get(11)?,
    max_discount: row.get(12)?,
    status,
    created_at: row.get(14)?,
    updated_at: row.get(15)?,
  })
}
