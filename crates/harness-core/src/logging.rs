//! Structured logging for tests
//!
//! Installs a `tracing` subscriber writing through the test writer, so output
//! is captured per test. The filter comes from `RUST_LOG` when set.

use tracing_subscriber::{fmt, EnvFilter};

/// Level used when `RUST_LOG` is not set
pub const DEFAULT_LEVEL: &str = "info";

/// Install the test subscriber at [`DEFAULT_LEVEL`]
///
/// Safe to call from every test; only the first call installs anything.
pub fn init() {
    try_init(DEFAULT_LEVEL, false);
}

/// Install the test subscriber, JSON formatted when `json` is set
///
/// Returns whether this call installed it.
pub fn try_init(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_test_writer().with_target(true);
    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(level, json, "test logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        assert!(!try_init("debug", false));
    }
}
