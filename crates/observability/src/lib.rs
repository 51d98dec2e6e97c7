//! Tracing and logging setup shared by every procura binary and test harness.

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops. An
/// unusable configuration falls back to the defaults and is reported once the
/// subscriber is installed.
pub fn init() {
    match ObservabilityConfig::from_env() {
        Ok(config) => tracing::init_with(&config),
        Err(err) => {
            tracing::init_with(&ObservabilityConfig::default());
            ::tracing::warn!(error = %err, "invalid logging configuration, using defaults");
        }
    }
}

/// Logging configuration loaded from `PROCURA_LOG*` variables.
pub mod config;

/// Subscriber installation (filters, formatting).
pub mod tracing;

pub use config::{ConfigError, LogFormat, ObservabilityConfig};
