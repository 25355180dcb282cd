//! Command line front end.
//!
//! Amounts accept Brazilian notation (`1.234,56`) as well as plain
//! (`1234.56`). Cost items are given as `label=value`, `label=HOURSxRATE` or
//! `label=QTYxPRICE`.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::domain::cost_items::{describe, CostItem, CostItemKind};
use crate::domain::currency::{format_brl, format_percent, parse_currency, INDETERMINATE};
use crate::domain::margin::{self, MarginResult};
use crate::domain::templates;
use crate::error::AppError;
use crate::models::{CalculationFilter, NewCalculation, SavedCalculation, Settings};
use crate::settings;
use crate::AppState;

#[derive(Parser, Debug)]
#[command(name = "margemforte", version, about = "Preço mínimo, margem e desconto máximo para o seu serviço")]
pub struct Cli {
  /// Directory holding the database and backups
  #[arg(long, global = true, env = "MARGEMFORTE_DATA_DIR")]
  pub data_dir: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Name recorded in the audit log
  #[arg(long, global = true)]
  pub actor: Option<String>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Calculate without saving
  Calc {
    #[command(flatten)]
    job: JobArgs,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },

  /// Calculate and save under a name
  Save {
    #[arg(long)]
    name: String,

    /// Template id (see `templates`)
    #[arg(long, default_value = templates::CUSTOM_TEMPLATE_ID)]
    template: String,

    #[command(flatten)]
    job: JobArgs,
  },

  /// List saved calculations, newest first
  List {
    #[arg(short, long)]
    search: Option<String>,

    #[arg(long)]
    page: Option<i64>,

    #[arg(long)]
    page_size: Option<i64>,

    #[arg(long)]
    json: bool,
  },

  /// Show one saved calculation
  Show {
    id: String,

    #[arg(long)]
    json: bool,
  },

  /// Delete a saved calculation
  Delete { id: String },

  /// Export saved calculations
  Export {
    #[arg(value_enum)]
    format: ExportFormat,

    /// Calculation id, required for the text report
    #[arg(long)]
    id: Option<String>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Import a JSON export
  Import { path: PathBuf },

  /// List the calculation templates
  Templates,

  /// List the tax regimes
  Regimes,

  /// Show or change defaults
  Settings {
    #[command(subcommand)]
    command: SettingsCommand,
  },

  /// Zip the database and a JSON copy of all calculations
  Backup {
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Replace the database with the one inside a backup
  Restore { archive: PathBuf },

  /// Show recent changes
  Audit {
    #[arg(long, default_value_t = 20)]
    limit: i64,
  },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
  Show,
  /// Keys: default_tax_regime, default_desired_margin, default_jobs_per_month, default_fixed_cost_monthly
  Set { key: String, value: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
  Json,
  Csv,
  Text,
  Xlsx,
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
  /// Price charged to the client
  #[arg(long, value_parser = parse_amount)]
  pub service: f64,

  /// Variable cost as a single amount
  #[arg(long, value_parser = parse_amount)]
  pub variable: Option<f64>,

  /// Cost item, `label=value`
  #[arg(long = "item", value_parser = parse_currency_item)]
  pub items: Vec<CostItem>,

  /// Labour, `label=HOURSxRATE`
  #[arg(long = "hours", value_parser = parse_hours_item)]
  pub hours: Vec<CostItem>,

  /// Quantity at a unit price, `label=QTYxPRICE`
  #[arg(long = "qty", value_parser = parse_quantity_item)]
  pub quantities: Vec<CostItem>,

  /// Monthly fixed costs
  #[arg(long, value_parser = parse_amount)]
  pub fixed: Option<f64>,

  /// Jobs per month sharing the fixed costs
  #[arg(long, value_parser = parse_amount)]
  pub jobs: Option<f64>,

  /// Desired margin in percent
  #[arg(long, value_parser = parse_amount)]
  pub margin: Option<f64>,

  /// Tax rate in percent
  #[arg(long, value_parser = parse_amount, conflicts_with = "regime")]
  pub tax: Option<f64>,

  /// Tax regime id (see `regimes`)
  #[arg(long)]
  pub regime: Option<String>,
}

impl JobArgs {
  /// Fills whatever was not given from the stored defaults.
  pub fn into_calculation(self, name: String, template_id: String, defaults: &Settings) -> Result<NewCalculation, AppError> {
    let tax_rate = match (self.tax, self.regime.as_deref()) {
      (Some(rate), _) => rate,
      (None, Some(id)) => templates::get_tax_regime(id)
        .map(|regime| regime.rate)
        .ok_or_else(|| AppError::new("INVALID_REGIME", format!("Regime tributário desconhecido: {id}")))?,
      (None, None) => defaults.default_tax_rate(),
    };

    let mut cost_items = Vec::new();
    if let Some(value) = self.variable {
      cost_items.push(CostItem::new("Custos variáveis", CostItemKind::Currency { value }));
    }
    cost_items.extend(self.items);
    cost_items.extend(self.hours);
    cost_items.extend(self.quantities);

    Ok(NewCalculation {
      name,
      template_id,
      cost_items,
      service_value: self.service,
      desired_margin: self.margin.unwrap_or(defaults.default_desired_margin),
      tax_rate,
      fixed_cost_monthly: self.fixed.unwrap_or(defaults.default_fixed_cost_monthly),
      jobs_per_month: self.jobs.unwrap_or(defaults.default_jobs_per_month),
    })
  }
}

pub fn parse_amount(value: &str) -> Result<f64, AppError> {
  Ok(parse_currency(value)?)
}

pub fn parse_currency_item(value: &str) -> Result<CostItem, AppError> {
  let (label, amount) = split_item(value)?;
  Ok(CostItem::new(label, CostItemKind::Currency { value: parse_amount(amount)? }))
}

pub fn parse_hours_item(value: &str) -> Result<CostItem, AppError> {
  let (label, pair) = split_item(value)?;
  let (hours, rate) = split_product(pair)?;
  Ok(CostItem::new(label, CostItemKind::HoursRate { hours, rate }))
}

pub fn parse_quantity_item(value: &str) -> Result<CostItem, AppError> {
  let (label, pair) = split_item(value)?;
  let (quantity, unit_price) = split_product(pair)?;
  Ok(CostItem::new(label, CostItemKind::QuantityPrice { quantity, unit_price }))
}

fn split_item(value: &str) -> Result<(&str, &str), AppError> {
  match value.rsplit_once('=') {
    Some((label, rest)) if !label.trim().is_empty() => Ok((label.trim(), rest.trim())),
    _ => Err(AppError::new(
      "INVALID_ITEM",
      format!("Item de custo deve ser rótulo=valor, recebido {value:?}"),
    )),
  }
}

fn split_product(pair: &str) -> Result<(f64, f64), AppError> {
  let (left, right) = pair
    .split_once(|c| c == 'x' || c == 'X' || c == '*')
    .ok_or_else(|| AppError::new("INVALID_ITEM", format!("Use QUANTIDADExVALOR, recebido {pair:?}")))?;
  Ok((parse_amount(left)?, parse_amount(right)?))
}

pub fn render_result(result: &MarginResult, service_value: f64) -> String {
  let markup = margin::markup(service_value, result.total_cost)
    .map_or_else(|| INDETERMINATE.to_string(), |value| format_percent(value, 2));
  let mut lines = vec![
    format!("Custo variável:         {}", format_brl(result.variable_cost)),
    format!("Custo fixo por serviço: {}", format_brl(result.fixed_per_job)),
    format!("Custo total:            {}", format_brl(result.total_cost)),
    format!("Imposto:                {}", format_brl(result.tax_amount)),
    format!("Preço mínimo:           {}", format_brl(result.minimum_price)),
    format!("Margem bruta:           {}", format_percent(result.gross_margin, 2)),
    format!("Margem líquida:         {}", format_percent(result.net_margin, 2)),
    format!("Desconto máximo:        {}", format_percent(result.max_discount, 2)),
    format!("Markup sobre o custo:   {markup}"),
    format!("Status:                 [{}] {}", result.status.as_str(), result.message),
  ];
  if !result.has_minimum_price() {
    lines.push("Margem desejada e imposto somam 100% ou mais: nenhum preço atinge a meta.".to_string());
  }
  lines.join("\n")
}

fn render_row(calc: &SavedCalculation) -> String {
  format!(
    "{}  {:<8} {:>10}  {:>16}  {}",
    calc.id,
    calc.status.as_str(),
    format_percent(calc.actual_margin, 2),
    format_brl(calc.minimum_price),
    calc.name
  )
}

fn render_saved(calc: &SavedCalculation) -> String {
  let mut lines = vec![format!("{} ({})", calc.name, calc.id)];
  lines.extend(calc.cost_items.iter().map(|item| format!("  - {}", describe(item))));
  lines.push(render_result(&commands::preview(&calc.inputs()), calc.service_value));
  lines.join("\n")
}

fn emit(output: Option<PathBuf>, content: &str) -> anyhow::Result<()> {
  match output {
    Some(path) => {
      std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
      eprintln!("Arquivo salvo em {}", path.display());
    }
    None => println!("{content}"),
  }
  Ok(())
}

pub fn run(state: &AppState, command: Command, actor: Option<&str>) -> anyhow::Result<()> {
  match command {
    Command::Calc { job, json } => {
      let defaults = commands::get_settings(state)?;
      let input = job.into_calculation(String::new(), templates::CUSTOM_TEMPLATE_ID.to_string(), &defaults)?;
      let result = commands::preview(&input);
      if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
      } else {
        println!("{}", render_result(&result, input.service_value));
      }
    }
    Command::Save { name, template, job } => {
      let defaults = commands::get_settings(state)?;
      let input = job.into_calculation(name, template, &defaults)?;
      let calc = commands::save_calculation(state, input, actor)?;
      println!("{}", render_saved(&calc));
    }
    Command::List {
      search,
      page,
      page_size,
      json,
    } => {
      let listing = commands::list_calculations(state, &CalculationFilter { search, page, page_size })?;
      if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
      } else {
        for calc in &listing.items {
          println!("{}", render_row(calc));
        }
        println!("{} de {} simulações", listing.items.len(), listing.total);
      }
    }
    Command::Show { id, json } => {
      let calc = commands::get_calculation(state, &id)?.ok_or_else(|| AppError::not_found(&id))?;
      if json {
        println!("{}", serde_json::to_string_pretty(&calc)?);
      } else {
        println!("{}", render_saved(&calc));
      }
    }
    Command::Delete { id } => {
      if !commands::delete_calculation(state, &id, actor)? {
        return Err(AppError::not_found(&id).into());
      }
      println!("Simulação {id} excluída");
    }
    Command::Export { format, id, output } => match format {
      ExportFormat::Json => emit(output, &commands::export_json(state)?)?,
      ExportFormat::Csv => match output {
        Some(path) => {
          commands::export_csv_file(state, &path)?;
          eprintln!("Arquivo salvo em {}", path.display());
        }
        None => println!("{}", commands::export_csv(state)?),
      },
      ExportFormat::Text => {
        let Some(id) = id else {
          bail!("--id é obrigatório para o relatório em texto");
        };
        let report = commands::export_text(state, &id)?.ok_or_else(|| AppError::not_found(&id))?;
        emit(output, &report)?;
      }
      ExportFormat::Xlsx => {
        let path = output.unwrap_or_else(|| PathBuf::from("simulacoes.xlsx"));
        commands::export_xlsx(state, &path)?;
        eprintln!("Arquivo salvo em {}", path.display());
      }
    },
    Command::Import { path } => {
      let content = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
      let imported = commands::import_json(state, &content, actor)?;
      println!("{imported} simulações importadas");
    }
    Command::Templates => {
      for template in commands::list_templates() {
        let items: Vec<&str> = template.default_cost_items.iter().map(|item| item.label).collect();
        println!("{:<14} {}  [{}]", template.id, template.name, items.join(", "));
      }
    }
    Command::Regimes => {
      for regime in commands::list_tax_regimes() {
        println!("{:<16} {:>8}  {}", regime.id, format_percent(regime.rate, 2), regime.name);
      }
    }
    Command::Settings { command } => {
      let mut current = commands::get_settings(state)?;
      if let SettingsCommand::Set { key, value } = command {
        settings::set_value(&mut current, &key, &value)?;
        current = commands::update_settings(state, current, actor)?;
      }
      println!("{}", serde_json::to_string_pretty(&current)?);
    }
    Command::Backup { output } => {
      let path = commands::create_backup(state, output, actor)?;
      println!("Backup salvo em {}", path.display());
    }
    Command::Restore { archive } => {
      commands::restore_backup(state, &archive, actor)?;
      println!("Backup restaurado de {}", archive.display());
    }
    Command::Audit { limit } => {
      for entry in commands::list_audit_log(state, limit)? {
        println!(
          "{}  {:<16} {:<12} {}",
          entry.ts,
          entry.action,
          entry.entity_type,
          entry.entity_id.unwrap_or_default()
        );
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_cost_items() {
    let item = parse_currency_item("Materiais=1.234,50").unwrap();
    assert_eq!(item.label, "Materiais");
    assert_eq!(item.kind, CostItemKind::Currency { value: 1234.5 });

    let item = parse_hours_item("Mão de obra = 3x50").unwrap();
    assert_eq!(item.label, "Mão de obra");
    assert_eq!(item.kind, CostItemKind::HoursRate { hours: 3.0, rate: 50.0 });

    let item = parse_quantity_item("Embalagem=10*2,5").unwrap();
    assert_eq!(
      item.kind,
      CostItemKind::QuantityPrice {
        quantity: 10.0,
        unit_price: 2.5
      }
    );
  }

  #[test]
  fn rejects_malformed_items() {
    assert_eq!(parse_currency_item("120").unwrap_err().code, "INVALID_ITEM");
    assert_eq!(parse_currency_item("=120").unwrap_err().code, "INVALID_ITEM");
    assert_eq!(parse_hours_item("Horas=3").unwrap_err().code, "INVALID_ITEM");
    assert_eq!(parse_hours_item("Horas=3x").unwrap_err().code, "INVALID_CURRENCY");
  }

  #[test]
  fn job_args_fall_back_to_defaults() {
    let cli = Cli::try_parse_from([
      "margemforte",
      "calc",
      "--service",
      "1.000,00",
      "--variable",
      "400",
      "--hours",
      "Mão de obra=2x50",
    ])
    .unwrap();
    let Command::Calc { job, json } = cli.command else {
      panic!("expected calc");
    };
    assert!(!json);

    let input = job.into_calculation(String::new(), "personalizado".to_string(), &Settings::default()).unwrap();
    assert_eq!(input.service_value, 1000.0);
    assert_eq!(input.cost_items.len(), 2);
    assert_eq!(input.tax_rate, 5.0);
    assert_eq!(input.desired_margin, 20.0);
    assert_eq!(input.jobs_per_month, 20.0);

    let result = commands::preview(&input);
    assert_eq!(result.variable_cost, 500.0);
  }

  #[test]
  fn regime_and_tax_are_exclusive() {
    let parsed = Cli::try_parse_from(["margemforte", "calc", "--service", "10", "--tax", "5", "--regime", "mei"]);
    assert!(parsed.is_err());

    let cli = Cli::try_parse_from(["margemforte", "calc", "--service", "10", "--regime", "lucro_presumido"]).unwrap();
    let Command::Calc { job, .. } = cli.command else {
      panic!("expected calc");
    };
    let input = job.into_calculation(String::new(), "personalizado".to_string(), &Settings::default()).unwrap();
    assert_eq!(input.tax_rate, 16.33);
  }

  #[test]
  fn renders_indeterminate_minimum_price() {
    let result = commands::calculate(&crate::domain::margin::MarginInput {
      service_value: 1000.0,
      variable_cost: 400.0,
      fixed_cost_monthly: 0.0,
      jobs_per_month: 1.0,
      desired_margin: 100.0,
      tax_rate: 0.0,
    });
    let text = render_result(&result, 1000.0);
    assert!(text.contains("Preço mínimo:           indefinido"));
    assert!(text.contains("Markup sobre o custo:   150,00%"));
    assert!(text.contains("[warning] Margem abaixo do alvo"));
    assert!(text.ends_with("nenhum preço atinge a meta."));
  }

  #[test]
  fn markup_is_indeterminate_without_costs() {
    let result = commands::calculate(&crate::domain::margin::MarginInput {
      service_value: 500.0,
      variable_cost: 0.0,
      fixed_cost_monthly: 0.0,
      jobs_per_month: 1.0,
      desired_margin: 20.0,
      tax_rate: 5.0,
    });
    let text = render_result(&result, 500.0);
    assert!(text.contains("Markup sobre o custo:   indefinido"));
    assert!(text.contains("Preço mínimo:           R$ 0,00"));
    assert!(!text.contains("nenhum preço"));
  }
}
