use thiserror::Error;

use crate::error::AppError;

pub const INDETERMINATE: &str = "indefinido";

#[derive(Debug, Error, PartialEq)]
pub enum CurrencyError {
  #[error("valor vazio")]
  Empty,
  #[error("valor negativo não é permitido: {0}")]
  Negative(String),
  #[error("valor inválido: {0}")]
  Invalid(String),
}

impl From<CurrencyError> for AppError {
  fn from(err: CurrencyError) -> Self {
    AppError::new("INVALID_CURRENCY", err.to_string())
  }
}

pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

/// Parses a typed amount such as `R$ 1.234,56`, `1234,5` or `1234.56`.
///
/// A comma is always the decimal separator and dots around it group
/// thousands. Without a comma a single dot is a decimal point and several
/// dots group thousands.
pub fn parse_currency(input: &str) -> Result<f64, CurrencyError> {
  let trimmed = input.trim();
  let body = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
  if body.is_empty() {
    return Err(CurrencyError::Empty);
  }
  if body.starts_with('-') {
    return Err(CurrencyError::Negative(input.trim().to_string()));
  }

  let normalized = if body.contains(',') {
    body.replace('.', "").replacen(',', ".", 1)
  } else if body.matches('.').count() > 1 {
    body.replace('.', "")
  } else {
    body.to_string()
  };

  let valid = normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    && normalized.chars().any(|c| c.is_ascii_digit())
    && normalized.matches('.').count() <= 1;
  if !valid {
    return Err(CurrencyError::Invalid(input.trim().to_string()));
  }

  normalized
    .parse::<f64>()
    .ok()
    .filter(|value| value.is_finite())
    .ok_or_else(|| CurrencyError::Invalid(input.trim().to_string()))
}

/// `R$ 1.234,56`; anything non-finite renders as "indefinido".
pub fn format_brl(value: f64) -> String {
  if !value.is_finite() {
    return INDETERMINATE.to_string();
  }
  let cents = (value.abs() * 100.0).round();
  let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
  let whole = (cents / 100.0).trunc();
  let fraction = (cents - whole * 100.0) as u64;
  format!("{sign}R$ {},{fraction:02}", group_thousands(&format!("{whole:.0}")))
}

/// `42,86%` with the given number of decimals.
pub fn format_percent(value: f64, decimals: usize) -> String {
  if !value.is_finite() {
    return INDETERMINATE.to_string();
  }
  format!("{}%", format!("{value:.decimals$}").replace('.', ","))
}

fn group_thousands(digits: &str) -> String {
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (idx, ch) in digits.chars().enumerate() {
    if idx > 0 && (digits.len() - idx) % 3 == 0 {
      out.push('.');
    }
    out.push(ch);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_brazilian_and_plain_notation() {
    assert_eq!(parse_currency("R$ 1.234,56"), Ok(1234.56));
    assert_eq!(parse_currency("1234,5"), Ok(1234.5));
    assert_eq!(parse_currency("1234.56"), Ok(1234.56));
    assert_eq!(parse_currency("1.000.000"), Ok(1_000_000.0));
    assert_eq!(parse_currency("  80 "), Ok(80.0));
  }

  #[test]
  fn rejects_bad_amounts() {
    assert_eq!(parse_currency("   "), Err(CurrencyError::Empty));
    assert_eq!(parse_currency("R$"), Err(CurrencyError::Empty));
    assert!(matches!(parse_currency("-10"), Err(CurrencyError::Negative(_))));
    assert!(matches!(parse_currency("12a"), Err(CurrencyError::Invalid(_))));
    assert!(matches!(parse_currency("1,2,3"), Err(CurrencyError::Invalid(_))));
    assert!(matches!(parse_currency("."), Err(CurrencyError::Invalid(_))));
  }

  #[test]
  fn formats_reais() {
    assert_eq!(format_brl(1234.56), "R$ 1.234,56");
    assert_eq!(format_brl(0.0), "R$ 0,00");
    assert_eq!(format_brl(769.230769), "R$ 769,23");
    assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    assert_eq!(format_brl(-10.0), "-R$ 10,00");
    assert_eq!(format_brl(f64::INFINITY), "indefinido");
  }

  #[test]
  fn formats_percent() {
    assert_eq!(format_percent(42.857, 2), "42,86%");
    assert_eq!(format_percent(30.0, 1), "30,0%");
    assert_eq!(format_percent(f64::NAN, 2), "indefinido");
  }

  #[test]
  fn rounds_to_cents() {
    assert_eq!(round2(571.428571), 571.43);
    assert_eq!(round2(-0.001), 0.0);
  }
}
