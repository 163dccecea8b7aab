use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::sql_generator::Dialect;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Unrecognised name for an enumerated setting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseVariantError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        ParseVariantError {
            kind,
            value: value.to_string(),
        }
    }
}

/// When a navigation from an already projected entity may extend the join
/// graph of the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenPolicy {
    /// Projected entities are narrowed; navigating from them wraps the scope
    #[default]
    Conservative,
    /// Keep joining in place while the source alias is still visible
    Eager,
}

impl FromStr for FlattenPolicy {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(FlattenPolicy::Conservative),
            "eager" => Ok(FlattenPolicy::Eager),
            _ => Err(ParseVariantError::new("flatten policy", s)),
        }
    }
}

impl fmt::Display for FlattenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenPolicy::Conservative => write!(f, "conservative"),
            FlattenPolicy::Eager => write!(f, "eager"),
        }
    }
}

/// Translator configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Identifier quoting of the generated SQL
    pub dialect: Dialect,

    pub flatten_policy: FlattenPolicy,

    /// Spaces per nesting level of subqueries
    #[validate(range(max = 16, message = "Indent width must be between 0 and 16"))]
    pub indent_width: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Quoted,
            flatten_policy: FlattenPolicy::Conservative,
            indent_width: 4,
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            dialect: parse_env_var("ENTSQL_DIALECT", "quoted")?,
            flatten_policy: parse_env_var("ENTSQL_FLATTEN_POLICY", "conservative")?,
            indent_width: parse_env_var("ENTSQL_INDENT_WIDTH", "4")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            dialect: cli.dialect,
            flatten_policy: cli.flatten_policy,
            indent_width: cli.indent_width,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Merge with another configuration, keeping only the settings `other`
    /// sets explicitly.
    pub fn merge(&mut self, other: CliConfig) {
        if let Some(dialect) = other.dialect_override {
            self.dialect = dialect;
        }
        if let Some(policy) = other.flatten_policy_override {
            self.flatten_policy = policy;
        }
        if let Some(width) = other.indent_width_override {
            self.indent_width = width;
        }
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub dialect: Dialect,
    pub flatten_policy: FlattenPolicy,
    pub indent_width: usize,
    /// Settings given explicitly on the command line
    pub dialect_override: Option<Dialect>,
    pub flatten_policy_override: Option<FlattenPolicy>,
    pub indent_width_override: Option<usize>,
}

impl CliConfig {
    pub fn new(
        dialect: Option<Dialect>,
        flatten_policy: Option<FlattenPolicy>,
        indent_width: Option<usize>,
    ) -> Self {
        let defaults = TranslatorConfig::default();
        CliConfig {
            dialect: dialect.unwrap_or(defaults.dialect),
            flatten_policy: flatten_policy.unwrap_or(defaults.flatten_policy),
            indent_width: indent_width.unwrap_or(defaults.indent_width),
            dialect_override: dialect,
            flatten_policy_override: flatten_policy,
            indent_width_override: indent_width,
        }
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        env::remove_var("ENTSQL_DIALECT");
        env::remove_var("ENTSQL_FLATTEN_POLICY");
        env::remove_var("ENTSQL_INDENT_WIDTH");
    }

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dialect, Dialect::Quoted);
        assert_eq!(config.flatten_policy, FlattenPolicy::Conservative);
        assert_eq!(config.indent_width, 4);
    }

    #[test]
    fn test_invalid_indent_width() {
        let config = TranslatorConfig {
            indent_width: 17,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("Eager".parse::<FlattenPolicy>(), Ok(FlattenPolicy::Eager));
        assert_eq!(
            "sometimes".parse::<FlattenPolicy>(),
            Err(ParseVariantError::new("flatten policy", "sometimes"))
        );
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = TranslatorConfig::from_env().unwrap();
        assert_eq!(config, TranslatorConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("ENTSQL_DIALECT", "sqlite");
        env::set_var("ENTSQL_FLATTEN_POLICY", "eager");
        env::set_var("ENTSQL_INDENT_WIDTH", "2");
        let config = TranslatorConfig::from_env().unwrap();
        clear_env();
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.flatten_policy, FlattenPolicy::Eager);
        assert_eq!(config.indent_width, 2);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        env::set_var("ENTSQL_DIALECT", "oracle");
        let err = TranslatorConfig::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "ENTSQL_DIALECT"));

        env::set_var("ENTSQL_INDENT_WIDTH", "40");
        let err = TranslatorConfig::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_yaml_file_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect: postgres").unwrap();
        let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.indent_width, 4);
    }

    #[test]
    fn test_merge_keeps_unset_cli_values() {
        let mut config = TranslatorConfig {
            dialect: Dialect::Mysql,
            indent_width: 8,
            ..Default::default()
        };
        config.merge(CliConfig::new(None, Some(FlattenPolicy::Eager), Some(2)));
        assert_eq!(config.dialect, Dialect::Mysql);
        assert_eq!(config.flatten_policy, FlattenPolicy::Eager);
        assert_eq!(config.indent_width, 2);
    }

    #[test]
    fn test_from_cli_validates() {
        let cli = CliConfig::new(Some(Dialect::Sqlite), None, Some(99));
        assert!(matches!(
            TranslatorConfig::from_cli(cli),
            Err(ConfigError::Validation(_))
        ));
    }
}
