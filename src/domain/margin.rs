use serde::{Deserialize, Serialize};

use crate::domain::sentinel;

/// Net margin (percent) at or above which a job without a target is healthy.
pub const SAFE_NET_MARGIN: f64 = 20.0;
/// Net margin (percent) below which a job without a target is at risk.
pub const WARNING_NET_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginInput {
  pub service_value: f64,
  pub variable_cost: f64,
  pub fixed_cost_monthly: f64,
  pub jobs_per_month: f64,
  pub desired_margin: f64,
  pub tax_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginStatus {
  Safe,
  Warning,
  Danger,
}

impl MarginStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      MarginStatus::Safe => "safe",
      MarginStatus::Warning => "warning",
      MarginStatus::Danger => "danger",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "safe" => Some(MarginStatus::Safe),
      "warning" => Some(MarginStatus::Warning),
      "danger" => Some(MarginStatus::Danger),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginResult {
  pub variable_cost: f64,
  pub fixed_per_job: f64,
  pub total_cost: f64,
  /// `f64::INFINITY` when margin and tax together consume the whole price.
  #[serde(with = "sentinel")]
  pub minimum_price: f64,
  pub max_discount: f64,
  pub gross_margin: f64,
  pub tax_amount: f64,
  pub net_margin: f64,
  pub status: MarginStatus,
  pub message: String,
}

impl MarginResult {
  pub fn has_minimum_price(&self) -> bool {
    self.minimum_price.is_finite()
  }
}

/// How a net margin is turned into a [`MarginStatus`].
///
/// A job with a target margin is judged against that target; a job without
/// one falls back to the fixed 20% / 10% thresholds. The two are never mixed:
/// [`StatusPolicy::for_target`] picks exactly one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusPolicy {
  GoalRelative { target: f64 },
  AbsoluteThreshold,
}

impl StatusPolicy {
  /// `target` must already be clamped to `[0, 100]`.
  pub fn for_target(target: f64) -> Self {
    if target > 0.0 {
      StatusPolicy::GoalRelative { target }
    } else {
      StatusPolicy::AbsoluteThreshold
    }
  }

  pub fn classify(self, net_margin: f64) -> (MarginStatus, &'static str) {
    match self {
      StatusPolicy::GoalRelative { target } => {
        if net_margin >= target {
          (MarginStatus::Safe, "Margem acima do alvo!")
        } else if net_margin >= 0.0 {
          (MarginStatus::Warning, "Margem abaixo do alvo")
        } else {
          (MarginStatus::Danger, "Alerta: prejuízo no cenário atual")
        }
      }
      StatusPolicy::AbsoluteThreshold => {
        if net_margin >= SAFE_NET_MARGIN {
          (MarginStatus::Safe, "Excelente margem de lucro!")
        } else if net_margin >= WARNING_NET_MARGIN {
          (MarginStatus::Warning, "Atenção: margem apertada")
        } else {
          (MarginStatus::Danger, "Alerta: risco de prejuízo")
        }
      }
    }
  }
}

/// Clamp a percentage to `[0, 100]`; NaN counts as 0.
pub fn clamp_percent(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, 100.0)
  }
}

/// Amortization denominator, never below one job. NaN counts as one.
pub fn effective_jobs(jobs_per_month: f64) -> f64 {
  jobs_per_month.max(1.0)
}

/// Price needed to keep `margin`% after `tax`% on top of `total_cost`.
/// Both percentages are expected clamped.
pub fn minimum_price(total_cost: f64, margin: f64, tax: f64) -> f64 {
  let reserved = margin + tax;
  if reserved >= 100.0 {
    f64::INFINITY
  } else {
    total_cost / (1.0 - reserved / 100.0)
  }
}

/// Discount off `service_value` that still reaches `minimum_price`, not floored.
/// Negative when the current price is already below the minimum.
pub fn raw_discount(service_value: f64, minimum_price: f64) -> f64 {
  percent_of(service_value - minimum_price, safe_denominator(service_value))
}

/// Profit as a percentage of cost. `None` when there is no cost to mark up.
pub fn markup(service_value: f64, total_cost: f64) -> Option<f64> {
  if total_cost > 0.0 {
    Some(percent_of(service_value - total_cost, total_cost))
  } else {
    None
  }
}

pub fn calculate_margin(input: &MarginInput) -> MarginResult {
  let MarginInput {
    service_value,
    variable_cost,
    fixed_cost_monthly,
    jobs_per_month,
    desired_margin,
    tax_rate,
  } = *input;

  let fixed_per_job = fixed_cost_monthly / effective_jobs(jobs_per_month);
  let total_cost = variable_cost + fixed_per_job;

  let tax = clamp_percent(tax_rate);
  let tax_amount = service_value * tax / 100.0;
  let target = clamp_percent(desired_margin);

  let minimum_price = minimum_price(total_cost, target, tax);
  let max_discount = raw_discount(service_value, minimum_price).max(0.0);

  let base = safe_denominator(service_value);
  let gross_margin = percent_of(service_value - total_cost, base);
  let net_margin = percent_of(service_value - total_cost - tax_amount, base);

  let (status, message) = StatusPolicy::for_target(target).classify(net_margin);

  MarginResult {
    variable_cost,
    fixed_per_job,
    total_cost,
    minimum_price,
    max_discount,
    gross_margin,
    tax_amount,
    net_margin,
    status,
    message: message.to_string(),
  }
}

// No price entered yet: divide by one so the figures stay finite.
fn safe_denominator(service_value: f64) -> f64 {
  if service_value > 0.0 {
    service_value
  } else {
    1.0
  }
}

fn percent_of(part: f64, whole: f64) -> f64 {
  part * 100.0 / whole
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::currency::round2;
  use proptest::prelude::*;

  fn input() -> MarginInput {
    MarginInput {
      service_value: 1000.0,
      variable_cost: 400.0,
      fixed_cost_monthly: 0.0,
      jobs_per_month: 10.0,
      desired_margin: 30.0,
      tax_rate: 0.0,
    }
  }

  #[test]
  fn basic_margin_without_tax_or_fixed_costs() {
    let r = calculate_margin(&input());
    assert_eq!(round2(r.gross_margin), 60.0);
    assert_eq!(round2(r.net_margin), 60.0);
    assert_eq!(r.total_cost, 400.0);
    assert_eq!(r.fixed_per_job, 0.0);
    assert_eq!(r.tax_amount, 0.0);
    assert_eq!(round2(r.minimum_price), 571.43);
    assert_eq!(round2(r.max_discount), 42.86);
  }

  #[test]
  fn tax_enters_the_minimum_price_denominator() {
    let r = calculate_margin(&MarginInput { tax_rate: 5.0, ..input() });
    assert_eq!(r.tax_amount, 50.0);
    assert_eq!(round2(r.gross_margin), 60.0);
    assert_eq!(round2(r.net_margin), 55.0);
    assert_eq!(round2(r.minimum_price), 615.38);
  }

  #[test]
  fn brazilian_tax_regimes() {
    let cases = [(5.0, 50.0, 45.0), (6.0, 60.0, 44.0), (15.5, 155.0, 34.5), (16.33, 163.3, 33.67)];
    for (rate, tax, net) in cases {
      let r = calculate_margin(&MarginInput {
        variable_cost: 500.0,
        tax_rate: rate,
        ..input()
      });
      assert_eq!(round2(r.tax_amount), tax, "tax at {rate}%");
      assert_eq!(round2(r.net_margin), net, "net at {rate}%");
    }
  }

  #[test]
  fn plan_verification_scenario() {
    let r = calculate_margin(&MarginInput {
      service_value: 1000.0,
      variable_cost: 400.0,
      fixed_cost_monthly: 2000.0,
      jobs_per_month: 20.0,
      desired_margin: 30.0,
      tax_rate: 5.0,
    });
    assert_eq!(r.fixed_per_job, 100.0);
    assert_eq!(r.total_cost, 500.0);
    assert_eq!(r.tax_amount, 50.0);
    assert!((r.net_margin - 45.0).abs() < 0.01);
    assert!((r.minimum_price - 769.23).abs() < 0.01);
    assert_eq!(r.status, MarginStatus::Safe);
  }

  #[test]
  fn fixed_costs_raise_cost_and_minimum_price() {
    let without = calculate_margin(&input());
    let with = calculate_margin(&MarginInput {
      fixed_cost_monthly: 2000.0,
      jobs_per_month: 20.0,
      ..input()
    });
    assert_eq!(with.total_cost, 500.0);
    assert_eq!(round2(with.gross_margin), 50.0);
    assert!(with.gross_margin < without.gross_margin);
    assert!(with.minimum_price > without.minimum_price);
  }

  #[test]
  fn job_count_is_floored_at_one() {
    for jobs in [0.0, -5.0, 0.5, f64::NAN] {
      let r = calculate_margin(&MarginInput {
        fixed_cost_monthly: 1000.0,
        jobs_per_month: jobs,
        ..input()
      });
      assert_eq!(r.fixed_per_job, 1000.0, "jobs = {jobs}");
    }
  }

  #[test]
  fn unbounded_job_count_spreads_fixed_cost_to_nothing() {
    let r = calculate_margin(&MarginInput {
      fixed_cost_monthly: 2000.0,
      jobs_per_month: f64::INFINITY,
      ..input()
    });
    assert_eq!(r.fixed_per_job, 0.0);
    assert_eq!(effective_jobs(f64::INFINITY), f64::INFINITY);
    assert_eq!(effective_jobs(f64::NEG_INFINITY), 1.0);
  }

  #[test]
  fn absolute_thresholds_without_target() {
    let status = |variable_cost: f64, tax_rate: f64| {
      calculate_margin(&MarginInput {
        variable_cost,
        tax_rate,
        desired_margin: 0.0,
        ..input()
      })
    };

    let r = status(700.0, 0.0);
    assert_eq!(r.status, MarginStatus::Safe);
    assert_eq!(r.message, "Excelente margem de lucro!");
    assert_eq!(status(800.0, 0.0).status, MarginStatus::Safe);
    let r = status(850.0, 0.0);
    assert_eq!(r.status, MarginStatus::Warning);
    assert_eq!(r.message, "Atenção: margem apertada");
    assert_eq!(status(900.0, 0.0).status, MarginStatus::Warning);
    let r = status(950.0, 0.0);
    assert_eq!(r.status, MarginStatus::Danger);
    assert_eq!(r.message, "Alerta: risco de prejuízo");

    // 20% before tax, 15% after.
    assert_eq!(status(800.0, 5.0).status, MarginStatus::Warning);
  }

  #[test]
  fn loss_is_danger() {
    let r = calculate_margin(&MarginInput {
      service_value: 100.0,
      variable_cost: 200.0,
      tax_rate: 5.0,
      desired_margin: 0.0,
      ..input()
    });
    assert!(r.net_margin < 0.0);
    assert_eq!(r.status, MarginStatus::Danger);
  }

  #[test]
  fn goal_relative_status_with_target() {
    let at = |service_value: f64| {
      calculate_margin(&MarginInput {
        service_value,
        variable_cost: 700.0,
        desired_margin: 30.0,
        ..input()
      })
    };

    let r = at(1000.0);
    assert_eq!(r.status, MarginStatus::Safe);
    assert_eq!(r.message, "Margem acima do alvo!");
    let r = at(800.0);
    assert_eq!(r.status, MarginStatus::Warning);
    assert_eq!(r.message, "Margem abaixo do alvo");
    let r = at(600.0);
    assert_eq!(r.status, MarginStatus::Danger);
    assert_eq!(r.message, "Alerta: prejuízo no cenário atual");
  }

  #[test]
  fn unreachable_margin_has_no_minimum_price() {
    for (margin, tax) in [(100.0, 0.0), (50.0, 50.0), (60.0, 50.0), (150.0, 0.0), (30.0, 70.0)] {
      let r = calculate_margin(&MarginInput {
        desired_margin: margin,
        tax_rate: tax,
        ..input()
      });
      assert_eq!(r.minimum_price, f64::INFINITY, "margin {margin} tax {tax}");
      assert!(!r.has_minimum_price());
      assert_eq!(r.max_discount, 0.0);
    }
  }

  #[test]
  fn out_of_range_percentages_are_clamped() {
    let r = calculate_margin(&MarginInput { tax_rate: -10.0, ..input() });
    assert_eq!(r.tax_amount, 0.0);

    let r = calculate_margin(&MarginInput { tax_rate: 150.0, ..input() });
    assert_eq!(r.tax_amount, 1000.0);

    let r = calculate_margin(&MarginInput { desired_margin: -20.0, ..input() });
    assert_eq!(round2(r.minimum_price), r.total_cost);
  }

  #[test]
  fn zero_price_and_zero_everything_stay_finite() {
    let r = calculate_margin(&MarginInput {
      service_value: 0.0,
      variable_cost: 100.0,
      ..input()
    });
    assert!(r.gross_margin.is_finite());
    assert!(r.net_margin.is_finite());

    let r = calculate_margin(&MarginInput {
      service_value: 0.0,
      variable_cost: 0.0,
      fixed_cost_monthly: 0.0,
      jobs_per_month: 0.0,
      desired_margin: 0.0,
      tax_rate: 0.0,
    });
    assert!(r.gross_margin.is_finite());
    assert!(r.net_margin.is_finite());
    assert_eq!(r.tax_amount, 0.0);
    assert!(!r.max_discount.is_nan());
  }

  #[test]
  fn extreme_magnitudes() {
    let r = calculate_margin(&MarginInput {
      service_value: 1_000_000_000.0,
      variable_cost: 500_000_000.0,
      ..input()
    });
    assert_eq!(round2(r.gross_margin), 50.0);

    let r = calculate_margin(&MarginInput {
      service_value: 0.01,
      variable_cost: 0.005,
      ..input()
    });
    assert_eq!(round2(r.gross_margin), 50.0);
  }

  #[test]
  fn discount_at_and_above_minimum_price() {
    let r = calculate_margin(&MarginInput {
      service_value: 400.0 / 0.7,
      ..input()
    });
    assert_eq!(round2(r.max_discount), 0.0);

    let r = calculate_margin(&MarginInput { service_value: 2000.0, ..input() });
    assert_eq!(round2(r.max_discount), 71.43);
  }

  #[test]
  fn raw_discount_goes_negative_below_minimum_price() {
    let r = calculate_margin(&MarginInput { service_value: 100.0, ..input() });
    assert_eq!(r.max_discount, 0.0);
    assert!(raw_discount(100.0, r.minimum_price) < 0.0);
  }

  #[test]
  fn markup_is_relative_to_cost() {
    assert_eq!(markup(1000.0, 500.0), Some(100.0));
    assert_eq!(markup(1000.0, 0.0), None);
  }

  #[test]
  fn serializes_unreachable_price_as_sentinel() {
    let r = calculate_margin(&MarginInput { desired_margin: 100.0, ..input() });
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["minimum_price"], "Infinity");
    assert_eq!(json["status"], "warning");
    let back: MarginResult = serde_json::from_value(json).unwrap();
    assert_eq!(back.minimum_price, f64::INFINITY);
  }

  fn any_input() -> impl Strategy<Value = MarginInput> {
    (
      0.0f64..1e6,
      0.0f64..1e6,
      0.0f64..1e6,
      -50.0f64..200.0,
      -50.0f64..150.0,
      -50.0f64..150.0,
    )
      .prop_map(
        |(service_value, variable_cost, fixed_cost_monthly, jobs_per_month, desired_margin, tax_rate)| MarginInput {
          service_value,
          variable_cost,
          fixed_cost_monthly,
          jobs_per_month,
          desired_margin,
          tax_rate,
        },
      )
  }

  proptest! {
    #[test]
    fn same_input_same_output(input in any_input()) {
      let a = calculate_margin(&input);
      let b = calculate_margin(&input);
      prop_assert_eq!(a.minimum_price.to_bits(), b.minimum_price.to_bits());
      prop_assert_eq!(a.net_margin.to_bits(), b.net_margin.to_bits());
      prop_assert_eq!(a, b);
    }

    #[test]
    fn zero_tax_keeps_net_equal_to_gross(input in any_input()) {
      let r = calculate_margin(&MarginInput { tax_rate: 0.0, ..input });
      prop_assert_eq!(r.net_margin, r.gross_margin);
    }

    #[test]
    fn tax_gap_equals_clamped_rate(input in any_input(), price in 1.0f64..1e6) {
      let input = MarginInput { service_value: price, ..input };
      let r = calculate_margin(&input);
      let gap = r.gross_margin - r.net_margin;
      prop_assert!((gap - clamp_percent(input.tax_rate)).abs() < 1e-6);
    }

    #[test]
    fn more_tax_never_raises_net_margin(input in any_input(), low in -50.0f64..150.0, extra in 0.0f64..100.0) {
      let lower = calculate_margin(&MarginInput { tax_rate: low, ..input });
      let higher = calculate_margin(&MarginInput { tax_rate: low + extra, ..input });
      prop_assert!(higher.net_margin <= lower.net_margin);
    }

    #[test]
    fn fixed_cost_is_amortized_over_at_least_one_job(input in any_input()) {
      let r = calculate_margin(&input);
      prop_assert_eq!(r.fixed_per_job, input.fixed_cost_monthly / input.jobs_per_month.max(1.0));
      prop_assert_eq!(r.total_cost, input.variable_cost + r.fixed_per_job);
    }

    #[test]
    fn minimum_price_is_infinite_exactly_when_unreachable(input in any_input()) {
      let r = calculate_margin(&input);
      let reserved = clamp_percent(input.desired_margin) + clamp_percent(input.tax_rate);
      prop_assert_eq!(r.minimum_price.is_infinite(), reserved >= 100.0);
      prop_assert!(r.max_discount >= 0.0);
      prop_assert!(!r.gross_margin.is_nan() && !r.net_margin.is_nan() && !r.max_discount.is_nan());
    }
  }
}
