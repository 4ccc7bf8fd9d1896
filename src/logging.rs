//! Console logging for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! binary. The filter defaults to `info` and can be overridden through `RUST_LOG`.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Builds the filter: `RUST_LOG` when set and valid, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs a stderr subscriber, keeping stdout for the report.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(default_level: &str) -> bool {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_level() {
        assert_eq!(DEFAULT_LOG_LEVEL, "info");
        // Constructing the filter never panics, whatever RUST_LOG holds.
        let _ = env_filter(DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn second_init_is_reported() {
        init_logging(DEFAULT_LOG_LEVEL);
        assert!(!init_logging(DEFAULT_LOG_LEVEL));
    }
}
