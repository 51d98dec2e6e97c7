//! Configuration loading and representation.

use thiserror::Error;

pub const REFRESH_DEPENDENT_LINES_VAR: &str = "PROCURA_REFRESH_DEPENDENT_LINES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false), got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}

/// Settings for the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfraConfig {
    /// Re-derive purchase line names when a product's origin names change.
    pub refresh_dependent_lines: bool,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            refresh_dependent_lines: true,
        }
    }
}

impl InfraConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let refresh_dependent_lines = match lookup(REFRESH_DEPENDENT_LINES_VAR) {
            Some(raw) if !raw.trim().is_empty() => parse_bool(REFRESH_DEPENDENT_LINES_VAR, &raw)?,
            _ => Self::default().refresh_dependent_lines,
        };
        Ok(Self {
            refresh_dependent_lines,
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(value: Option<&str>) -> Result<InfraConfig, ConfigError> {
        InfraConfig::from_lookup(|key| {
            assert_eq!(key, REFRESH_DEPENDENT_LINES_VAR);
            value.map(str::to_string)
        })
    }

    #[test]
    fn refresh_is_enabled_by_default() {
        assert!(with(None).unwrap().refresh_dependent_lines);
        assert!(with(Some("")).unwrap().refresh_dependent_lines);
    }

    #[test]
    fn accepts_common_boolean_spellings() {
        assert!(!with(Some("false")).unwrap().refresh_dependent_lines);
        assert!(!with(Some(" OFF ")).unwrap().refresh_dependent_lines);
        assert!(with(Some("1")).unwrap().refresh_dependent_lines);
    }

    #[test]
    fn rejects_garbage() {
        let err = with(Some("sometimes")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                var: REFRESH_DEPENDENT_LINES_VAR,
                value: "sometimes".to_string()
            }
        );
    }
}
