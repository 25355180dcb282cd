use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "MARGEMFORTE_LOG";
const DEFAULT_FILTER: &str = "margemforte=info";

/// Installs the global subscriber, writing to stderr so command output on
/// stdout stays machine readable. `verbose` raises the default to debug.
pub fn init(verbose: bool) {
  let fallback = if verbose { "margemforte=debug" } else { DEFAULT_FILTER };
  let filter = EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new(fallback));

  // A second call (tests, embedding) keeps the first subscriber.
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}
