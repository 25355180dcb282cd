use serde::{Deserialize, Serialize};

use crate::domain::cost_items::{sum_cost_items, CostItem};
use crate::domain::margin::{MarginInput, MarginStatus};
use crate::domain::sentinel;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
  pub default_tax_regime: String,
  pub default_desired_margin: f64,
  pub default_jobs_per_month: f64,
  pub default_fixed_cost_monthly: f64,
}

/// Everything the user typed for one calculation; the result snapshot is
/// derived from it when it is stored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewCalculation {
  pub name: String,
  pub template_id: String,
  pub cost_items: Vec<CostItem>,
  pub service_value: f64,
  pub desired_margin: f64,
  pub tax_rate: f64,
  pub fixed_cost_monthly: f64,
  pub jobs_per_month: f64,
}

impl NewCalculation {
  pub fn margin_input(&self) -> MarginInput {
    MarginInput {
      service_value: self.service_value,
      variable_cost: sum_cost_items(&self.cost_items),
      fixed_cost_monthly: self.fixed_cost_monthly,
      jobs_per_month: self.jobs_per_month,
      desired_margin: self.desired_margin,
      tax_rate: self.tax_rate,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CalculationUpdate {
  pub name: Option<String>,
  pub template_id: Option<String>,
  pub cost_items: Option<Vec<CostItem>>,
  pub service_value: Option<f64>,
  pub desired_margin: Option<f64>,
  pub tax_rate: Option<f64>,
  pub fixed_cost_monthly: Option<f64>,
  pub jobs_per_month: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SavedCalculation {
  pub id: String,
  pub name: String,
  pub template_id: String,
  pub cost_items: Vec<CostItem>,
  pub service_value: f64,
  pub desired_margin: f64,
  pub tax_rate: f64,
  pub fixed_cost_monthly: f64,
  pub jobs_per_month: f64,
  pub total_cost: f64,
  #[serde(with = "sentinel")]
  pub minimum_price: f64,
  pub actual_margin: f64,
  #[serde(with = "sentinel")]
  pub max_discount: f64,
  pub status: MarginStatus,
  pub created_at: String,
  pub updated_at: String,
}

impl SavedCalculation {
  pub fn inputs(&self) -> NewCalculation {
    NewCalculation {
      name: self.name.clone(),
      template_id: self.template_id.clone(),
      cost_items: self.cost_items.clone(),
      service_value: self.service_value,
      desired_margin: self.desired_margin,
      tax_rate: self.tax_rate,
      fixed_cost_monthly: self.fixed_cost_monthly,
      jobs_per_month: self.jobs_per_month,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CalculationFilter {
  pub search: Option<String>,
  pub page: Option<i64>,
  pub page_size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub id: i64,
  pub ts: String,
  pub actor: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub payload_json: String,
}
