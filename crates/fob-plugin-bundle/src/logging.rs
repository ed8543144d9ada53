//! Logging utilities for fob-plugin-bundle
//!
//! This module is only available with the `logging` feature.
//!
//! The plugin reports child build progress as `tracing` events under the
//! `fob_plugin_bundle` target. Libraries embedding it should install their own
//! subscriber; the helpers below are for applications and examples.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Verbosity of the plugin's own events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Nothing
    Silent,
    /// Skipped entry points and asset conflicts
    #[default]
    Warn,
    /// Child build phases
    Debug,
    /// Every skipped `import()` expression
    Trace,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Silent => "fob_plugin_bundle=off",
            LogLevel::Warn => "fob_plugin_bundle=warn",
            LogLevel::Debug => "fob_plugin_bundle=debug,fob_host=debug",
            LogLevel::Trace => "fob_plugin_bundle=trace,fob_host=trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

/// Install a compact subscriber for the plugin's events
///
/// Only the first call in a process takes effect. `RUST_LOG` directives are
/// added on top of `level`.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        for directive in level.directive().split(',') {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        install(filter);
    });
}

/// Install a compact subscriber configured from `RUST_LOG` alone
///
/// Falls back to [`LogLevel::Warn`] when `RUST_LOG` is unset or invalid.
pub fn init_logging_from_env() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.directive()));
        install(filter);
    });
}

fn install(filter: EnvFilter) {
    // The embedding application may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true).without_time())
        .try_init();
}
