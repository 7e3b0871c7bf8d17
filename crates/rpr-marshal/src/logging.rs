//! Logging setup
//!
//! The crate logs through `tracing`; embedders that already install a
//! subscriber need nothing from here.

pub use tracing::{debug, info, trace, warn, Level};

use rpr_config::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RPR_LOG` nor a configured filter is set
pub const DEFAULT_FILTER: &str = "rpr_marshal=info";

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "RPR_LOG";

/// Install a compact fmt subscriber
///
/// The filter comes from `RPR_LOG` if set, then `filter`, then
/// [`DEFAULT_FILTER`]. Does nothing if a global subscriber already exists.
pub fn init_logging(filter: Option<&str>) {
    let filter = build_filter(filter);

    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .ok(); // Already initialized
}

/// Install logging with the filter from `config`
pub fn init_from_config(config: &Config) {
    init_logging(config.log_filter());
}

fn build_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        configured
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(Some("rpr_marshal=debug"));
        init_logging(None);
        debug!(target: "rpr_marshal", "still alive");
    }

    #[test]
    fn test_invalid_configured_filter_falls_back() {
        // Unparseable directives fall back to the default instead of panicking
        let filter = build_filter(Some("rpr_marshal=[[["));
        assert!(!filter.to_string().is_empty());
    }
}
