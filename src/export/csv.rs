use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::currency::INDETERMINATE;
use crate::error::AppError;
use crate::models::SavedCalculation;

const HEADER: &str =
  "Nome,Template,Valor do Serviço,Custo Total,Margem Desejada,Margem Real,Preço Mínimo,Desconto Máximo,Criado em";

/// One line per calculation under a fixed header; empty when there is nothing
/// to export.
pub fn calculations_csv(calculations: &[SavedCalculation]) -> String {
  if calculations.is_empty() {
    return String::new();
  }

  let mut lines = Vec::with_capacity(calculations.len() + 1);
  lines.push(HEADER.to_string());
  for calc in calculations {
    lines.push(
      [
        quote_csv(&calc.name),
        quote_csv(&calc.template_id),
        fixed2(calc.service_value),
        fixed2(calc.total_cost),
        fixed2(calc.desired_margin),
        fixed2(calc.actual_margin),
        fixed2(calc.minimum_price),
        fixed2(calc.max_discount),
        calc.created_at.clone(),
      ]
      .join(","),
    );
  }
  lines.join("\n")
}

pub fn export_csv(calculations: &[SavedCalculation], path: &Path) -> Result<(), AppError> {
  let mut file = File::create(path)?;
  file.write_all(calculations_csv(calculations).as_bytes())?;
  Ok(())
}

fn fixed2(value: f64) -> String {
  if value.is_finite() {
    format!("{value:.2}")
  } else {
    INDETERMINATE.to_string()
  }
}

fn quote_csv(value: &str) -> String {
  format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calculations::build_snapshot;
  use crate::models::NewCalculation;

  fn calc(name: &str, desired_margin: f64) -> SavedCalculation {
    build_snapshot(
      "id".to_string(),
      NewCalculation {
        name: name.to_string(),
        template_id: "confeitaria".to_string(),
        cost_items: Vec::new(),
        service_value: 1000.0,
        desired_margin,
        tax_rate: 5.0,
        fixed_cost_monthly: 0.0,
        jobs_per_month: 1.0,
      },
      "2026-10-19T12:00:00.000Z".to_string(),
      "2026-10-19T12:00:00.000Z".to_string(),
    )
  }

  #[test]
  fn empty_history_exports_nothing() {
    assert_eq!(calculations_csv(&[]), "");
  }

  #[test]
  fn quotes_text_and_marks_indeterminate_prices() {
    let csv = calculations_csv(&[calc("Bolo \"especial\", 2kg", 95.0)]);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], HEADER);
    assert_eq!(
      lines[1],
      "\"Bolo \"\"especial\"\", 2kg\",\"confeitaria\",1000.00,0.00,95.00,95.00,indefinido,0.00,2026-10-19T12:00:00.000Z"
    );
  }

  #[test]
  fn writes_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("simulacoes.csv");
    export_csv(&[calc("Bolo", 30.0)], &path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("Nome,"));
    assert!(content.contains(",1000.00,0.00,30.00,95.00,0.00,100.00,"));
  }
}
