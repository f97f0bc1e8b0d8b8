//! tracing subscriber setup
//!
//! Logs always go to stderr so stdout stays a clean JSON or table stream.
//! Filter precedence: `IMS_LOG`, then the `log_level` config key, then
//! `warn`. `--verbose` forces `debug`, `--quiet` forces `error`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::Config;

/// Pick the filter directive for this run
pub fn filter_directive(config: &Config, verbose: bool, quiet: bool) -> String {
    if verbose {
        return "debug".to_string();
    }
    if quiet {
        return "error".to_string();
    }
    config
        .log_level
        .clone()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

/// Install the global subscriber; repeated calls are ignored
pub fn init(config: &Config, verbose: bool, quiet: bool) {
    let directive = filter_directive(config, verbose, quiet);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs() {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init()
    };
    // A subscriber is already set in tests; that is fine
    let _ = result;
}
