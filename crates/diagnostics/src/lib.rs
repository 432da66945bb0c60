// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the GCS plugin crates.
//!
//! Output is controlled by the `GCS_PLUGINS_LOG` environment variable:
//! - `off` (default): no logs
//! - `error`, `warn`, `info`, `debug`: minimum level written to stderr

use std::sync::Once;

// Re-export emit so the macros below resolve in dependent crates
pub use emit;

/// Environment variable holding the log level.
pub const LOG_ENV: &str = "GCS_PLUGINS_LOG";

static INIT: Once = Once::new();

/// Parsed value of [`LOG_ENV`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSetting {
    Off,
    Min(emit::Level),
}

/// Parse a level name. Returns `None` for unrecognized values.
#[must_use]
pub fn parse_setting(value: &str) -> Option<LogSetting> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Some(LogSetting::Off),
        "error" => Some(LogSetting::Min(emit::Level::Error)),
        "warn" => Some(LogSetting::Min(emit::Level::Warn)),
        "info" => Some(LogSetting::Min(emit::Level::Info)),
        "debug" => Some(LogSetting::Min(emit::Level::Debug)),
        _ => None,
    }
}

/// Initialize diagnostics from [`LOG_ENV`].
///
/// Safe to call more than once; only the first call installs a runtime.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let raw = std::env::var(LOG_ENV).unwrap_or_default();
        let (setting, unknown) = match parse_setting(&raw) {
            Some(setting) => (setting, false),
            None => (LogSetting::Min(emit::Level::Info), true),
        };

        let LogSetting::Min(level) = setting else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        if unknown {
            emit::warn!("Unknown {env} value {value}, using info", env: LOG_ENV, value: raw);
        }

        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log basic operations a user may want to see (bucket created, path deleted).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed steps (objects found, pairs planned).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable failures, such as a path that could not be deleted.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that abort an operation.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
