use anyhow::Context;
use clap::Parser;
use tracing::debug;

use margemforte::cli::{self, Cli};
use margemforte::{db, logging, AppState};

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  let app_dir = match cli.data_dir {
    Some(dir) => dir,
    None => db::resolve_app_dir().context("resolving the data directory")?,
  };
  debug!(dir = %app_dir.display(), "opening data directory");

  let state = AppState::open(&app_dir).with_context(|| format!("opening database in {}", app_dir.display()))?;
  cli::run(&state, cli.command, cli.actor.as_deref())
}
