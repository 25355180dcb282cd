use crate::domain::cost_items::{CostItem, CostItemKind};
use crate::domain::templates;
use crate::error::AppError;

pub fn ensure_name(name: &str) -> Result<String, AppError> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    Err(AppError::new("INVALID_NAME", "Informe um nome para a simulação"))
  } else {
    Ok(trimmed.to_string())
  }
}

pub fn ensure_amount(field: &str, amount: f64) -> Result<(), AppError> {
  if !amount.is_finite() || amount < 0.0 {
    Err(AppError::new(
      "INVALID_AMOUNT",
      format!("{field} deve ser um valor maior ou igual a zero"),
    ))
  } else {
    Ok(())
  }
}

pub fn ensure_percent(field: &str, rate: f64) -> Result<(), AppError> {
  if !(0.0..=100.0).contains(&rate) {
    Err(AppError::new(
      "INVALID_PERCENT",
      format!("{field} deve estar entre 0 e 100"),
    ))
  } else {
    Ok(())
  }
}

pub fn ensure_template(id: &str) -> Result<(), AppError> {
  if templates::get_template(id).is_none() {
    Err(AppError::new("UNKNOWN_TEMPLATE", format!("Modelo desconhecido: {id}")))
  } else {
    Ok(())
  }
}

pub fn ensure_cost_items(items: &[CostItem]) -> Result<(), AppError> {
  for item in items {
    match item.kind {
      CostItemKind::Currency { value } => ensure_amount(&item.label, value)?,
      CostItemKind::HoursRate { hours, rate } => {
        ensure_amount(&item.label, hours)?;
        ensure_amount(&item.label, rate)?;
      }
      CostItemKind::QuantityPrice { quantity, unit_price } => {
        ensure_amount(&item.label, quantity)?;
        ensure_amount(&item.label, unit_price)?;
      }
    }
  }
  Ok(())
}
