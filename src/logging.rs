use tracing_subscriber::EnvFilter;

/// Initialize structured logging.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the given level.
pub fn init(default_level: &str) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .init();
}
