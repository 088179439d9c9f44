//! Subscriber setup for mongokit's own diagnostics.
//!
//! The command logger writes its lines through a [`LogWriter`]; everything
//! else (bootstrap, missed starts, dropped records) goes through `tracing`.
//! Applications that already install a subscriber need nothing from here.
//!
//! # Environment Variables
//!
//! - `MONGOKIT_DEBUG=true|1|yes` - Enable debug logging
//! - `MONGOKIT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `MONGOKIT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! mongokit::logging::init();
//! ```
//!
//! [`LogWriter`]: crate::logger::LogWriter

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "MONGOKIT_DEBUG";
const LEVEL_VAR: &str = "MONGOKIT_LOG_LEVEL";
const FORMAT_VAR: &str = "MONGOKIT_LOG_FORMAT";

/// Check if `MONGOKIT_DEBUG` is set to a truthy value.
#[inline]
pub fn is_debug_enabled() -> bool {
    parse_flag(env::var(DEBUG_VAR).ok().as_deref())
}

/// The level from `MONGOKIT_LOG_LEVEL`.
///
/// Defaults to "debug" when `MONGOKIT_DEBUG` is on, otherwise "warn".
pub fn get_log_level() -> &'static str {
    resolve_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// The format from `MONGOKIT_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    resolve_format(env::var(FORMAT_VAR).ok().as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn resolve_level(value: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match value.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn resolve_format(value: Option<&str>) -> &'static str {
    match value.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Install a global subscriber for the `mongokit` target.
///
/// Does nothing unless `MONGOKIT_DEBUG` or `MONGOKIT_LOG_LEVEL` is set, or
/// when the `tracing-subscriber` feature is off. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("mongokit={}", level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: the host application may own the global subscriber.
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = get_log_format(), "mongokit logging initialized");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert!(parse_flag(Some("TRUE")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("off")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_level_fallbacks() {
        assert_eq!(resolve_level(None, false), "warn");
        assert_eq!(resolve_level(None, true), "debug");
        assert_eq!(resolve_level(Some("Info"), false), "info");
        assert_eq!(resolve_level(Some("loud"), true), "debug");
    }

    #[test]
    fn test_format_defaults_to_json() {
        assert_eq!(resolve_format(None), "json");
        assert_eq!(resolve_format(Some("COMPACT")), "compact");
        assert_eq!(resolve_format(Some("xml")), "json");
    }
}
