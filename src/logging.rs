// ABOUTME: Tracing subscriber setup for hosts embedding the template engine
// ABOUTME: Honours RUST_LOG first, then the configured level and output format

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a global `tracing` subscriber.
///
/// Returns `false` when a subscriber was already installed, which makes repeated
/// calls (e.g. from several tests) harmless.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> bool {
    let log_level = if verbose { "debug" } else { config.level.as_str() };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let installed = match config.format.as_str() {
        "compact" => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
            .is_ok(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
            .is_ok(),
    };

    if installed {
        debug!("Logging initialized with level: {}", log_level);
    }
    installed
}
