use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_VAR: &str = "PROCURA_LOG";
pub const LOG_FORMAT_VAR: &str = "PROCURA_LOG_FORMAT";
const FALLBACK_FILTER_VAR: &str = "RUST_LOG";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid log filter: {reason}")]
    InvalidFilter { var: &'static str, reason: String },

    #[error("PROCURA_LOG_FORMAT must be 'json' or 'pretty', got '{0}'")]
    InvalidFormat(String),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output for local runs.
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::InvalidFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,procura_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl ObservabilityConfig {
    /// `PROCURA_LOG` (else `RUST_LOG`, else `info`) and `PROCURA_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key, v))
        };

        let (filter_var, filter) = non_empty(LOG_FILTER_VAR)
            .or_else(|| non_empty(FALLBACK_FILTER_VAR))
            .unwrap_or((LOG_FILTER_VAR, DEFAULT_FILTER.to_string()));

        EnvFilter::try_new(&filter).map_err(|e| ConfigError::InvalidFilter {
            var: filter_var,
            reason: e.to_string(),
        })?;

        let format = match non_empty(LOG_FORMAT_VAR) {
            Some((_, raw)) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self { filter, format })
    }
}
