use serde::{Deserialize, Serialize};

use crate::domain::currency::format_brl;

/// How a cost line is entered: a plain amount, hours at an hourly rate, or a
/// quantity at a unit price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostItemKind {
  Currency { value: f64 },
  HoursRate { hours: f64, rate: f64 },
  QuantityPrice { quantity: f64, unit_price: f64 },
}

/// Input mode of a cost line without its numbers, used by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
  Currency,
  HoursRate,
  QuantityPrice,
}

impl CostKind {
  pub fn empty(self) -> CostItemKind {
    match self {
      CostKind::Currency => CostItemKind::Currency { value: 0.0 },
      CostKind::HoursRate => CostItemKind::HoursRate { hours: 0.0, rate: 0.0 },
      CostKind::QuantityPrice => CostItemKind::QuantityPrice {
        quantity: 0.0,
        unit_price: 0.0,
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
  pub id: String,
  pub label: String,
  #[serde(flatten)]
  pub kind: CostItemKind,
}

impl CostItem {
  pub fn new(label: impl Into<String>, kind: CostItemKind) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      label: label.into(),
      kind,
    }
  }

  pub fn value(&self) -> f64 {
    cost_item_value(&self.kind)
  }
}

/// Monetary value of one cost line. A product that overflows or involves NaN
/// counts as zero.
pub fn cost_item_value(kind: &CostItemKind) -> f64 {
  let value = match *kind {
    CostItemKind::Currency { value } => value,
    CostItemKind::HoursRate { hours, rate } => hours * rate,
    CostItemKind::QuantityPrice { quantity, unit_price } => quantity * unit_price,
  };
  if value.is_finite() {
    value
  } else {
    0.0
  }
}

pub fn sum_cost_items(items: &[CostItem]) -> f64 {
  items.iter().map(CostItem::value).sum()
}

pub fn describe(item: &CostItem) -> String {
  match item.kind {
    CostItemKind::Currency { value } => format!("{}: {}", item.label, format_brl(value)),
    CostItemKind::HoursRate { hours, rate } => format!(
      "{}: {}h x {} = {}",
      item.label,
      format_quantity(hours),
      format_brl(rate),
      format_brl(item.value())
    ),
    CostItemKind::QuantityPrice { quantity, unit_price } => format!(
      "{}: {} x {} = {}",
      item.label,
      format_quantity(quantity),
      format_brl(unit_price),
      format_brl(item.value())
    ),
  }
}

fn format_quantity(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{value:.0}")
  } else {
    value.to_string().replace('.', ",")
  }
}
