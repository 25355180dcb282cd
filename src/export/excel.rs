use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use tracing::info;

use crate::domain::currency::INDETERMINATE;
use crate::domain::margin::MarginStatus;
use crate::domain::templates;
use crate::error::AppError;
use crate::models::SavedCalculation;

const MONEY_FORMAT: &str = "[$R$-416] #,##0.00";
// Values are already percentage points, so no scaling by 100.
const PERCENT_FORMAT: &str = "0.00\"%\"";

struct Formats {
  header: Format,
  label: Format,
  money: Format,
  percent: Format,
  missing: Format,
}

impl Formats {
  fn new() -> Self {
    Self {
      header: Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x1A2433)),
      label: Format::new().set_bold(),
      money: Format::new().set_num_format(MONEY_FORMAT),
      percent: Format::new().set_num_format(PERCENT_FORMAT),
      missing: Format::new().set_italic().set_align(FormatAlign::Right),
    }
  }
}

pub fn export_xlsx(calculations: &[SavedCalculation], path: &Path) -> Result<(), AppError> {
  let formats = Formats::new();
  let mut workbook = Workbook::new();
  write_summary_sheet(&mut workbook, calculations, &formats)?;
  write_list_sheet(&mut workbook, calculations, &formats)?;
  workbook
    .save(path)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  info!(path = %path.display(), rows = calculations.len(), "xlsx export written");
  Ok(())
}

fn write_summary_sheet(
  workbook: &mut Workbook,
  calculations: &[SavedCalculation],
  formats: &Formats,
) -> Result<(), AppError> {
  let sheet = workbook.add_worksheet();
  sheet
    .set_name("RESUMO")
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  sheet.merge_range(0, 0, 0, 1, "Resumo das simulações", &formats.header)?;

  let count_status = |status: MarginStatus| calculations.iter().filter(|calc| calc.status == status).count() as f64;
  let average_margin = if calculations.is_empty() {
    0.0
  } else {
    calculations.iter().map(|calc| calc.actual_margin).sum::<f64>() / calculations.len() as f64
  };

  let rows = [
    ("Simulações", calculations.len() as f64, None),
    ("Margem real média", average_margin, Some(&formats.percent)),
    ("Saudáveis", count_status(MarginStatus::Safe), None),
    ("Em atenção", count_status(MarginStatus::Warning), None),
    ("Em risco", count_status(MarginStatus::Danger), None),
  ];

  let mut row = 2;
  for (label_text, value, format) in rows {
    sheet.write_string_with_format(row, 0, label_text, &formats.label)?;
    match format {
      Some(format) => sheet.write_number_with_format(row, 1, value, format)?,
      None => sheet.write_number(row, 1, value)?,
    };
    row += 1;
  }

  sheet.set_column_width(0, 28)?;
  sheet.set_column_width(1, 18)?;
  Ok(())
}

fn write_list_sheet(
  workbook: &mut Workbook,
  calculations: &[SavedCalculation],
  formats: &Formats,
) -> Result<(), AppError> {
  let sheet = workbook.add_worksheet();
  sheet
    .set_name("SIMULACOES")
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let headers = [
    "Nome",
    "Modelo",
    "Valor do Serviço",
    "Custo Total",
    "Margem Desejada",
    "Imposto",
    "Margem Real",
    "Preço Mínimo",
    "Desconto Máximo",
    "Status",
    "Criado em",
  ];
  for (col, title) in headers.iter().enumerate() {
    sheet.write_string_with_format(0, col as u16, *title, &formats.header)?;
  }
  sheet.set_freeze_panes(1, 0)?;

  for (idx, calc) in calculations.iter().enumerate() {
    let row = idx as u32 + 1;
    let template = templates::get_template(&calc.template_id)
      .map(|template| template.name)
      .unwrap_or(calc.template_id.as_str());

    sheet.write_string(row, 0, &calc.name)?;
    sheet.write_string(row, 1, template)?;
    sheet.write_number_with_format(row, 2, calc.service_value, &formats.money)?;
    sheet.write_number_with_format(row, 3, calc.total_cost, &formats.money)?;
    sheet.write_number_with_format(row, 4, calc.desired_margin, &formats.percent)?;
    sheet.write_number_with_format(row, 5, calc.tax_rate, &formats.percent)?;
    sheet.write_number_with_format(row, 6, calc.actual_margin, &formats.percent)?;
    write_optional(sheet, row, 7, calc.minimum_price, &formats.money, formats)?;
    write_optional(sheet, row, 8, calc.max_discount, &formats.percent, formats)?;
    sheet.write_string(row, 9, calc.status.as_str())?;
    sheet.write_string(row, 10, &calc.created_at)?;
  }

  let widths = [32, 24, 16, 16, 16, 12, 14, 16, 16, 10, 26];
  for (col, width) in widths.into_iter().enumerate() {
    sheet.set_column_width(col as u16, width)?;
  }
  Ok(())
}

fn write_optional(
  sheet: &mut Worksheet,
  row: u32,
  col: u16,
  value: f64,
  format: &Format,
  formats: &Formats,
) -> Result<(), AppError> {
  if value.is_finite() {
    sheet.write_number_with_format(row, col, value, format)?;
  } else {
    sheet.write_string_with_format(row, col, INDETERMINATE, &formats.missing)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calculations::build_snapshot;
  use crate::models::NewCalculation;

  #[test]
  fn writes_a_workbook_with_indeterminate_cells() {
    let calcs: Vec<SavedCalculation> = [30.0, 100.0]
      .into_iter()
      .map(|desired_margin| {
        build_snapshot(
          uuid::Uuid::new_v4().to_string(),
          NewCalculation {
            name: format!("Encomenda {desired_margin}"),
            template_id: "confeitaria".to_string(),
            cost_items: Vec::new(),
            service_value: 300.0,
            desired_margin,
            tax_rate: 5.0,
            fixed_cost_monthly: 600.0,
            jobs_per_month: 30.0,
          },
          "2026-10-19T12:00:00.000Z".to_string(),
          "2026-10-19T12:00:00.000Z".to_string(),
        )
      })
      .collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("simulacoes.xlsx");
    export_xlsx(&calcs, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"PK"));
  }

  #[test]
  fn empty_history_still_produces_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vazio.xlsx");
    export_xlsx(&[], &path).unwrap();
    assert!(path.exists());
  }
}
