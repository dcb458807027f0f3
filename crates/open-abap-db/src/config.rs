//! Session configuration.
//!
//! Supports loading configuration from:
//! - A TOML file
//! - Environment variables (OSQL_*), which take priority

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the context a session registers under when none is given.
pub const DEFAULT_CONTEXT: &str = "DEFAULT";

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Configuration for one Open SQL session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Logical context name the session is known under.
    pub context: String,
    /// Database location; `:memory:` for a private in-memory database.
    pub database: String,
    /// Write the final SQL of each statement to the trace target.
    pub trace: bool,
    /// How long the backend waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_string(),
            database: IN_MEMORY.to_string(),
            trace: false,
            busy_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    /// Create a configuration for a database location.
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Self::default()
        }
    }

    /// Create an in-memory configuration.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Set the context name.
    pub fn with_context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }

    /// Enable or disable SQL tracing.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }

    /// Check whether this configuration targets an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }

    /// Create configuration from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_vars()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_vars()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }

    /// Apply environment variables to configuration.
    ///
    /// Environment variables:
    /// - OSQL_CONTEXT: Context name (default: DEFAULT)
    /// - OSQL_DATABASE: Database path (default: :memory:)
    /// - OSQL_TRACE: `1`/`true`/`on` enables SQL tracing
    /// - OSQL_BUSY_TIMEOUT_MS: Busy timeout (default: 5000)
    pub fn apply_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("OSQL_CONTEXT") {
            self.context = val;
        }
        if let Ok(val) = std::env::var("OSQL_DATABASE") {
            self.database = val;
        }
        if let Ok(val) = std::env::var("OSQL_TRACE") {
            self.trace = parse_flag("OSQL_TRACE", &val)?;
        }
        if let Ok(val) = std::env::var("OSQL_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = val.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "OSQL_BUSY_TIMEOUT_MS".to_string(),
                value: val.clone(),
            })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.context.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "context".to_string(),
                value: self.context.clone(),
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database".to_string(),
                value: self.database.clone(),
            });
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Configuration error.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ConfigError {
    /// I/O error reading the config file.
    #[error("I/O error for {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Parse error in config text.
    #[error("parse error{}: {message}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {message}")]
    Serialize { message: String },

    /// A setting has an unusable value.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}
