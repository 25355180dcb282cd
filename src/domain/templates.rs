use serde::Serialize;

use crate::domain::cost_items::{CostItem, CostKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxRegime {
  pub id: &'static str,
  pub name: &'static str,
  pub rate: f64,
}

pub const TAX_REGIMES: &[TaxRegime] = &[
  TaxRegime {
    id: "mei",
    name: "MEI",
    rate: 5.0,
  },
  TaxRegime {
    id: "simples_6",
    name: "Simples Nacional (Anexo III)",
    rate: 6.0,
  },
  TaxRegime {
    id: "simples_15_5",
    name: "Simples Nacional (Anexo V)",
    rate: 15.5,
  },
  TaxRegime {
    id: "lucro_presumido",
    name: "Lucro Presumido",
    rate: 16.33,
  },
  TaxRegime {
    id: "isento",
    name: "Sem imposto",
    rate: 0.0,
  },
];

pub fn get_tax_regime(id: &str) -> Option<&'static TaxRegime> {
  TAX_REGIMES.iter().find(|regime| regime.id == id)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemplateCostItem {
  pub label: &'static str,
  pub kind: CostKind,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Template {
  pub id: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub default_cost_items: &'static [TemplateCostItem],
  pub suggested_tax_regime: Option<&'static str>,
  pub suggested_fixed_costs: &'static [&'static str],
}

impl Template {
  /// Fresh cost items for a new calculation, all values zeroed.
  pub fn blank_cost_items(&self) -> Vec<CostItem> {
    self
      .default_cost_items
      .iter()
      .map(|item| CostItem::new(item.label, item.kind.empty()))
      .collect()
  }

  pub fn suggested_tax_rate(&self) -> Option<f64> {
    self
      .suggested_tax_regime
      .and_then(get_tax_regime)
      .map(|regime| regime.rate)
  }
}

pub const CUSTOM_TEMPLATE_ID: &str = "personalizado";

const fn currency(label: &'static str) -> TemplateCostItem {
  TemplateCostItem {
    label,
    kind: CostKind::Currency,
  }
}

const fn hours(label: &'static str) -> TemplateCostItem {
  TemplateCostItem {
    label,
    kind: CostKind::HoursRate,
  }
}

pub const TEMPLATES: &[Template] = &[
  Template {
    id: "prestador",
    name: "Prestador de Serviço",
    description: "Calcule a margem para serviços gerais, manutenção, instalações e reparos",
    default_cost_items: &[currency("Deslocamento"), currency("Materiais"), hours("Mão de obra")],
    suggested_tax_regime: Some("mei"),
    suggested_fixed_costs: &["Aluguel/Espaço", "Seguro", "Contador"],
  },
  Template {
    id: "confeitaria",
    name: "Confeitaria / Doces",
    description: "Precifique bolos, doces, salgados e encomendas com todos os custos",
    default_cost_items: &[
      currency("Ingredientes"),
      currency("Embalagem"),
      currency("Gás/Energia"),
      hours("Mão de obra"),
    ],
    suggested_tax_regime: Some("mei"),
    suggested_fixed_costs: &["Aluguel da cozinha", "Energia elétrica", "Contador"],
  },
  Template {
    id: "consultoria",
    name: "Consultoria",
    description: "Margem de lucro para consultoria técnica, financeira e empresarial",
    default_cost_items: &[currency("Deslocamento"), currency("Materiais"), hours("Horas de consultoria")],
    suggested_tax_regime: Some("simples_6"),
    suggested_fixed_costs: &["Escritório/Coworking", "Software", "Contador"],
  },
  Template {
    id: "artesanal",
    name: "Produto Artesanal",
    description: "Precificação para artesanato, bijuterias, costura, crochê e produtos feitos à mão",
    default_cost_items: &[currency("Materiais"), currency("Embalagem"), hours("Mão de obra")],
    suggested_tax_regime: Some("mei"),
    suggested_fixed_costs: &["Espaço/Ateliê", "Energia", "Contador"],
  },
  Template {
    id: "freelancer",
    name: "Freelancer / TI",
    description: "Calcule quanto cobrar por projetos de desenvolvimento, design e marketing digital",
    default_cost_items: &[currency("Ferramentas/Software"), currency("Internet"), hours("Horas de trabalho")],
    suggested_tax_regime: Some("simples_6"),
    suggested_fixed_costs: &["Aluguel", "Energia", "Contador"],
  },
  Template {
    id: CUSTOM_TEMPLATE_ID,
    name: "Personalizado",
    description: "Monte seus próprios itens de custo para qualquer tipo de negócio",
    default_cost_items: &[],
    suggested_tax_regime: None,
    suggested_fixed_costs: &[],
  },
];

pub fn get_template(id: &str) -> Option<&'static Template> {
  TEMPLATES.iter().find(|template| template.id == id)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::cost_items::{sum_cost_items, CostItemKind};

  #[test]
  fn every_suggested_regime_exists() {
    for template in TEMPLATES {
      if let Some(regime) = template.suggested_tax_regime {
        assert!(get_tax_regime(regime).is_some(), "{} -> {regime}", template.id);
      }
    }
  }

  #[test]
  fn looks_up_templates_and_regimes() {
    assert_eq!(get_template("consultoria").map(|t| t.name), Some("Consultoria"));
    assert!(get_template("nope").is_none());
    assert_eq!(get_tax_regime("lucro_presumido").map(|r| r.rate), Some(16.33));
    assert_eq!(get_template("freelancer").and_then(Template::suggested_tax_rate), Some(6.0));
    assert_eq!(get_template(CUSTOM_TEMPLATE_ID).and_then(Template::suggested_tax_rate), None);
  }

  #[test]
  fn blank_items_follow_the_template() {
    let template = get_template("confeitaria").unwrap();
    let items = template.blank_cost_items();
    assert_eq!(items.len(), 4);
    assert_eq!(items[3].label, "Mão de obra");
    assert_eq!(items[3].kind, CostItemKind::HoursRate { hours: 0.0, rate: 0.0 });
    assert_eq!(sum_cost_items(&items), 0.0);
    assert_ne!(items[0].id, items[1].id);
  }
}
