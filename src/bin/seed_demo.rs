use std::path::PathBuf;

use chrono::Utc;
use rusqlite::Connection;

use margemforte::calculations;
use margemforte::db;
use margemforte::domain::cost_items::CostItemKind;
use margemforte::domain::templates::TEMPLATES;
use margemforte::error::AppError;
use margemforte::models::NewCalculation;
use margemforte::settings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let count = std::env::args()
    .nth(1)
    .and_then(|value| value.parse::<usize>().ok())
    .unwrap_or(200);

  let app_dir = if let Ok(path) = std::env::var("MARGEMFORTE_SEED_DIR") {
    PathBuf::from(path)
  } else {
    db::resolve_app_dir()?
  };

  let db = db::init_db(&app_dir)?;
  let created = db::with_conn(&db, |conn| seed_demo_data(conn, count))?;

  println!("{} simulações criadas em {}", created, app_dir.display());
  Ok(())
}

fn seed_demo_data(conn: &mut Connection, count: usize) -> Result<usize, AppError> {
  let defaults = settings::get_settings(conn)?;
  let clients = ["Ana", "Bruno", "Carla", "Diego", "Elisa", "Fábio", "Gabi"];

  let mut rng = MockRng::new(Utc::now().timestamp_millis() as u64);
  let tx = conn.transaction()?;

  for n in 0..count {
    let template = &TEMPLATES[(rng.next_u32() as usize) % TEMPLATES.len()];
    let client = clients[(rng.next_u32() as usize) % clients.len()];

    let mut cost_items = template.blank_cost_items();
    for item in &mut cost_items {
      item.kind = match item.kind {
        CostItemKind::Currency { .. } => CostItemKind::Currency {
          value: random_amount(&mut rng, 10.0, 400.0),
        },
        CostItemKind::HoursRate { .. } => CostItemKind::HoursRate {
          hours: f64::from(rng.next_u32() % 12 + 1),
          rate: random_amount(&mut rng, 30.0, 150.0),
        },
        CostItemKind::QuantityPrice { .. } => CostItemKind::QuantityPrice {
          quantity: f64::from(rng.next_u32() % 50 + 1),
          unit_price: random_amount(&mut rng, 0.5, 20.0),
        },
      };
    }

    let tax_rate = template
      .suggested_tax_rate()
      .unwrap_or_else(|| defaults.default_tax_rate());
    let margin_options = [10.0, 20.0, 30.0, 40.0];

    calculations::save_calculation(
      &tx,
      NewCalculation {
        name: format!("Demo {}: {} #{}", template.name, client, n + 1),
        template_id: template.id.to_string(),
        cost_items,
        service_value: random_amount(&mut rng, 150.0, 3000.0),
        desired_margin: margin_options[(rng.next_u32() as usize) % margin_options.len()],
        tax_rate,
        fixed_cost_monthly: random_amount(&mut rng, 0.0, 3000.0),
        jobs_per_month: f64::from(rng.next_u32() % 30 + 1),
      },
    )?;
  }

  tx.commit()?;
  Ok(count)
}

fn random_amount(rng: &mut MockRng, min: f64, max: f64) -> f64 {
  let range = (max - min).max(1.0);
  let base = min + (rng.next_u32() as f64 % range);
  let cents = (rng.next_u32() % 100) as f64 / 100.0;
  ((base + cents) * 100.0).round() / 100.0
}

struct MockRng {
  state: u64,
}

impl MockRng {
  fn new(seed: u64) -> Self {
    Self { state: seed }
  }

  fn next_u32(&mut self) -> u32 {
    self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
    (self.state >> 32) as u32
  }
}
