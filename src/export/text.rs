use chrono::DateTime;

use crate::domain::cost_items::describe;
use crate::domain::currency::{format_brl, format_percent};
use crate::domain::templates;
use crate::models::SavedCalculation;

/// Plain-text summary of one calculation, ready to paste into a message.
pub fn calculation_text(calc: &SavedCalculation) -> String {
  let template = templates::get_template(&calc.template_id)
    .map(|template| template.name)
    .unwrap_or(calc.template_id.as_str());

  let mut lines = vec![
    format!("Simulação: {}", calc.name),
    format!("Modelo: {template}"),
    String::new(),
    "Itens de custo:".to_string(),
  ];
  if calc.cost_items.is_empty() {
    lines.push("  (nenhum)".to_string());
  }
  lines.extend(calc.cost_items.iter().map(|item| format!("  - {}", describe(item))));
  lines.extend([
    String::new(),
    format!("Custo total: {}", format_brl(calc.total_cost)),
    format!("Valor do serviço: {}", format_brl(calc.service_value)),
    format!("Margem desejada: {}", format_percent(calc.desired_margin, 1)),
    format!("Imposto: {}", format_percent(calc.tax_rate, 2)),
    format!("Margem real: {}", format_percent(calc.actual_margin, 2)),
    format!("Preço mínimo: {}", format_brl(calc.minimum_price)),
    format!("Desconto máximo: {}", format_percent(calc.max_discount, 2)),
    String::new(),
    format!("Criado em: {}", format_timestamp(&calc.created_at)),
  ]);
  lines.join("\n")
}

fn format_timestamp(value: &str) -> String {
  DateTime::parse_from_rfc3339(value)
    .map(|ts| ts.format("%d/%m/%Y %H:%M:%S").to_string())
    .unwrap_or_else(|_| value.to_string())
}
