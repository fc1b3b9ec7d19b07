//! Log output for the server process.
//!
//! The subscriber is installed before the config file is read, so it starts at
//! `info` and is switched to `logging.level` once the config is loaded.
//! `RUST_LOG` always takes precedence over both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

const STARTUP_LEVEL: &str = "info";

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

/// Installs the global subscriber at the startup level.
///
/// Calling this twice is harmless; the first subscriber stays installed.
pub fn init_tracing() {
    let (filter, handle) = reload::Layer::new(log_filter(STARTUP_LEVEL));
    if FILTER.set(handle).is_err() {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switches the active filter to the configured level.
pub fn apply_logging_level(level: &str) {
    if rust_log_override().is_some() {
        return;
    }
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.reload(EnvFilter::new(level)) {
        tracing::warn!(error = %e, level, "could not change log level");
    } else {
        tracing::debug!(level, "log level applied");
    }
}

fn rust_log_override() -> Option<EnvFilter> {
    std::env::var_os(EnvFilter::DEFAULT_ENV)?;
    EnvFilter::try_from_default_env().ok()
}

/// `RUST_LOG` when it parses, otherwise `level`.
fn log_filter(level: &str) -> EnvFilter {
    rust_log_override().unwrap_or_else(|| EnvFilter::new(level))
}
