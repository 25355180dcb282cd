use rusqlite::{params, Connection};

use crate::domain::{templates, validation};
use crate::error::AppError;
use crate::models::Settings;

const KEY_TAX_REGIME: &str = "default_tax_regime";
const KEY_DESIRED_MARGIN: &str = "default_desired_margin";
const KEY_JOBS_PER_MONTH: &str = "default_jobs_per_month";
const KEY_FIXED_COST: &str = "default_fixed_cost_monthly";

impl Default for Settings {
  fn default() -> Self {
    Self {
      default_tax_regime: "mei".to_string(),
      default_desired_margin: 20.0,
      default_jobs_per_month: 20.0,
      default_fixed_cost_monthly: 0.0,
    }
  }
}

impl Settings {
  pub fn default_tax_rate(&self) -> f64 {
    templates::get_tax_regime(&self.default_tax_regime)
      .map(|regime| regime.rate)
      .unwrap_or(0.0)
  }
}

pub fn ensure_defaults(conn: &Connection) -> Result<(), AppError> {
  for (key, value) in to_pairs(&Settings::default()) {
    conn.execute(
      "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
      params![key, value],
    )?;
  }
  Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<Settings, AppError> {
  let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

  let mut settings = Settings::default();
  for row in rows {
    let (key, value) = row?;
    match key.as_str() {
      KEY_TAX_REGIME => {
        if templates::get_tax_regime(&value).is_some() {
          settings.default_tax_regime = value;
        }
      }
      KEY_DESIRED_MARGIN => {
        settings.default_desired_margin = value.parse().unwrap_or(settings.default_desired_margin);
      }
      KEY_JOBS_PER_MONTH => {
        settings.default_jobs_per_month = value.parse().unwrap_or(settings.default_jobs_per_month);
      }
      KEY_FIXED_COST => {
        settings.default_fixed_cost_monthly = value.parse().unwrap_or(settings.default_fixed_cost_monthly);
      }
      _ => {}
    }
  }

  Ok(settings)
}

pub fn validate(settings: &Settings) -> Result<(), AppError> {
  if templates::get_tax_regime(&settings.default_tax_regime).is_none() {
    return Err(AppError::new(
      "INVALID_REGIME",
      format!("Regime tributário desconhecido: {}", settings.default_tax_regime),
    ));
  }
  validation::ensure_percent("Margem desejada", settings.default_desired_margin)?;
  validation::ensure_amount("Custos fixos", settings.default_fixed_cost_monthly)?;
  if !(settings.default_jobs_per_month >= 1.0 && settings.default_jobs_per_month.is_finite()) {
    return Err(AppError::new("INVALID_JOBS", "Serviços por mês deve ser pelo menos 1"));
  }
  Ok(())
}

pub fn update_settings(conn: &Connection, settings: &Settings) -> Result<(), AppError> {
  validate(settings)?;
  for (key, value) in to_pairs(settings) {
    conn.execute(
      "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
      params![key, value],
    )?;
  }
  Ok(())
}

/// Applies one `key=value` change, as typed on the command line.
pub fn set_value(settings: &mut Settings, key: &str, value: &str) -> Result<(), AppError> {
  let number = || {
    value
      .trim()
      .replace(',', ".")
      .parse::<f64>()
      .map_err(|_| AppError::new("INVALID_SETTING", format!("{key}: número esperado, recebido {value:?}")))
  };
  match key {
    KEY_TAX_REGIME => settings.default_tax_regime = value.trim().to_string(),
    KEY_DESIRED_MARGIN => settings.default_desired_margin = number()?,
    KEY_JOBS_PER_MONTH => settings.default_jobs_per_month = number()?,
    KEY_FIXED_COST => settings.default_fixed_cost_monthly = number()?,
    other => {
      return Err(AppError::new("UNKNOWN_SETTING", format!("Configuração desconhecida: {other}")));
    }
  }
  Ok(())
}

fn to_pairs(settings: &Settings) -> [(&'static str, String); 4] {
  [
    (KEY_TAX_REGIME, settings.default_tax_regime.clone()),
    (KEY_DESIRED_MARGIN, settings.default_desired_margin.to_string()),
    (KEY_JOBS_PER_MONTH, settings.default_jobs_per_month.to_string()),
    (KEY_FIXED_COST, settings.default_fixed_cost_monthly.to_string()),
  ]
}
