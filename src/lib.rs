//! Pricing and margin calculator for small businesses.
//!
//! [`domain::margin::calculate_margin`] is the pure engine. Everything else
//! keeps named calculations in SQLite and turns them into reports.

pub mod audit;
pub mod calculations;
pub mod cli;
pub mod commands;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod files;
pub mod logging;
pub mod models;
pub mod settings;

use std::path::{Path, PathBuf};

use db::Db;
use error::AppError;

pub struct AppState {
  pub db: Db,
  pub app_dir: PathBuf,
}

impl AppState {
  pub fn open(app_dir: &Path) -> Result<Self, AppError> {
    let db = db::init_db(app_dir)?;
    Ok(Self {
      db,
      app_dir: app_dir.to_path_buf(),
    })
  }
}
