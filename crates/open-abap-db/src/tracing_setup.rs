//! Structured logging setup.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the embedding program. This module offers a ready-made one. SQL trace
//! output goes to the [`TRACE_TARGET`](crate::runtime::TRACE_TARGET) target,
//! so it can be filtered separately, e.g. `RUST_LOG=open_abap_db::trace=info`.

use std::env;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    /// Create from `OSQL_LOG` and `OSQL_LOG_FORMAT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            filter: env::var("OSQL_LOG").unwrap_or(defaults.filter),
            format: env::var("OSQL_LOG_FORMAT")
                .ok()
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.format),
        }
    }

    /// Set the filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable output
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// JSON for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(TracingError::UnknownFormat(s.to_string())),
        }
    }
}

/// Tracing initialization errors.
#[derive(Debug, Error, Diagnostic)]
pub enum TracingError {
    #[error("unknown log format '{0}'")]
    #[diagnostic(code(osql::tracing::format), help("use pretty, compact or json"))]
    UnknownFormat(String),

    #[error("invalid log filter '{filter}': {message}")]
    #[diagnostic(code(osql::tracing::filter))]
    Filter { filter: String, message: String },

    #[error("failed to initialize tracing: {0}")]
    #[diagnostic(code(osql::tracing::init))]
    Init(String),
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` overrides the configured filter. Fails if a global subscriber
/// is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| TracingError::Filter {
            filter: config.filter.clone(),
            message: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true),
            )
            .try_init(),
    };

    result.map_err(|e| TracingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TracingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = TracingConfig::default()
            .with_filter("open_abap_db::trace=info")
            .with_format(LogFormat::Compact);
        assert_eq!(config.filter, "open_abap_db::trace=info");
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_second_init_fails_cleanly() {
        let config = TracingConfig::default().with_format(LogFormat::Compact);
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(TracingError::Init(_))));
    }
}
