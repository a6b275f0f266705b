// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Store-level `config.json` and optional project-level `ctx.toml`
//! configuration loading and validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version written into every store's `config.json` on `init`.
pub const STORE_SCHEMA_VERSION: &str = "0.1";

/// Default optimizer token cap, per §4.13.
pub const DEFAULT_TOKEN_CAP: u32 = 32_000;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level configuration issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A deprecated field was used in the configuration.
    DeprecatedField {
        /// Name of the deprecated field.
        field: String,
        /// Suggested replacement, if any.
        suggestion: Option<String>,
    },
    /// The configured token cap is unusually small to be useful.
    SmallTokenCap {
        /// The configured value.
        value: u32,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeprecatedField { field, suggestion } => {
                write!(f, "deprecated field '{field}'")?;
                if let Some(s) = suggestion {
                    write!(f, " — use '{s}' instead")?;
                }
                Ok(())
            }
            Self::SmallTokenCap { value } => {
                write!(f, "token cap {value} is unusually small")
            }
        }
    }
}

/// The store's own schema-version marker, persisted at `.ctx/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StoreConfig {
    /// Store schema version, currently `"0.1"`.
    pub version: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: STORE_SCHEMA_VERSION.to_string(),
        }
    }
}

/// Optional project-level configuration, loaded from a `ctx.toml` at the
/// repository root if present.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Overrides the optimizer's default token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_cap: Option<u32>,

    /// Additional path globs the optimizer should never admit.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Overrides the optimizer's default `include_tests` flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_tests: Option<bool>,

    /// A deprecated alias for `token_cap`, kept for backward compatibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            token_cap: None,
            ignore: Vec::new(),
            include_tests: None,
            max_tokens: None,
        }
    }
}

impl ProjectConfig {
    /// Effective token cap: `token_cap`, falling back to the deprecated
    /// `max_tokens` alias, falling back to [`DEFAULT_TOKEN_CAP`].
    #[must_use]
    pub fn effective_token_cap(&self) -> u32 {
        self.token_cap
            .or(self.max_tokens)
            .unwrap_or(DEFAULT_TOKEN_CAP)
    }
}

/// Load a [`ProjectConfig`] from an optional TOML file path. Returns the
/// default configuration if `path` is `None`.
pub fn load_project_config(path: Option<&Path>) -> Result<ProjectConfig, ConfigError> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_project_toml(&content)
        }
        None => Ok(ProjectConfig::default()),
    }
}

/// Parse a TOML string into a [`ProjectConfig`].
pub fn parse_project_toml(content: &str) -> Result<ProjectConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Validate a [`ProjectConfig`], returning advisory warnings. Hard errors
/// (a zero token cap) come back as [`ConfigError::ValidationError`].
pub fn validate_project_config(config: &ProjectConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(cap) = config.token_cap {
        if cap == 0 {
            errors.push("token_cap must be greater than zero".to_string());
        } else if cap < 256 {
            warnings.push(ConfigWarning::SmallTokenCap { value: cap });
        }
    }

    if config.max_tokens.is_some() {
        warnings.push(ConfigWarning::DeprecatedField {
            field: "max_tokens".to_string(),
            suggestion: Some("token_cap".to_string()),
        });
    }

    if !errors.is_empty() {
        return Err(ConfigError::ValidationError { reasons: errors });
    }
    Ok(warnings)
}

/// Parse the store's `config.json` contents into a [`StoreConfig`].
pub fn parse_store_config(content: &str) -> Result<StoreConfig, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_project_config_uses_default_cap() {
        let c = ProjectConfig::default();
        assert_eq!(c.effective_token_cap(), DEFAULT_TOKEN_CAP);
    }

    #[test]
    fn token_cap_overrides_default() {
        let c = ProjectConfig {
            token_cap: Some(8_000),
            ..ProjectConfig::default()
        };
        assert_eq!(c.effective_token_cap(), 8_000);
    }

    #[test]
    fn max_tokens_alias_used_when_token_cap_absent() {
        let c = ProjectConfig {
            max_tokens: Some(16_000),
            ..ProjectConfig::default()
        };
        assert_eq!(c.effective_token_cap(), 16_000);
    }

    #[test]
    fn zero_token_cap_is_a_hard_error() {
        let c = ProjectConfig {
            token_cap: Some(0),
            ..ProjectConfig::default()
        };
        assert!(validate_project_config(&c).is_err());
    }

    #[test]
    fn small_token_cap_is_a_warning() {
        let c = ProjectConfig {
            token_cap: Some(100),
            ..ProjectConfig::default()
        };
        let warnings = validate_project_config(&c).unwrap();
        assert!(matches!(warnings[0], ConfigWarning::SmallTokenCap { value: 100 }));
    }

    #[test]
    fn parse_toml_round_trips() {
        let toml = "token_cap = 5000\nignore = [\"vendor/**\"]\n";
        let c = parse_project_toml(toml).unwrap();
        assert_eq!(c.token_cap, Some(5000));
        assert_eq!(c.ignore, vec!["vendor/**".to_string()]);
    }

    #[test]
    fn store_config_defaults_to_current_version() {
        assert_eq!(StoreConfig::default().version, STORE_SCHEMA_VERSION);
    }

    #[test]
    fn parse_store_config_json() {
        let json = r#"{"version":"0.1"}"#;
        let c = parse_store_config(json).unwrap();
        assert_eq!(c.version, "0.1");
    }
}
