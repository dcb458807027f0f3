//! Error types for the Open SQL engine.
//!
//! Mutations never surface backend faults through this type; they are
//! folded into `subrc`/`dbcnt` instead. What remains here are query-time
//! faults and programming errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::runtime::{BackendError, Condition};

/// Errors that can occur while executing Open SQL.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    /// Statement issued on a session without a live backend handle.
    #[error("no open database connection for context '{context}'")]
    #[diagnostic(
        code(osql::not_connected),
        help("call connect() before issuing statements")
    )]
    NotConnected {
        /// Logical context name of the session.
        context: String,
    },

    /// Raw backend fault, propagated when no condition mapper is installed.
    #[error(transparent)]
    #[diagnostic(code(osql::backend))]
    Backend(#[from] BackendError),

    /// Backend fault re-typed into a domain condition.
    #[error(transparent)]
    #[diagnostic(code(osql::condition))]
    Condition(#[from] Condition),

    /// Fetch on a cursor that has already been closed.
    #[error("cursor is closed")]
    #[diagnostic(code(osql::cursor_closed))]
    CursorClosed,

    /// Invalid configuration.
    #[error(transparent)]
    #[diagnostic(code(osql::config))]
    Config(#[from] ConfigError),

    /// The blocking worker running a backend call panicked or was cancelled.
    #[error("database worker failed: {0}")]
    #[diagnostic(code(osql::worker))]
    Join(String),
}

impl DbError {
    /// The typed condition, if this error carries one.
    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            DbError::Condition(c) => Some(c),
            _ => None,
        }
    }

    /// The raw backend fault, if this error carries one.
    pub fn as_backend(&self) -> Option<&BackendError> {
        match self {
            DbError::Backend(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a connection-lifecycle misuse.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, DbError::NotConnected { .. })
    }
}

/// Result type for Open SQL operations.
pub type DbResult<T> = Result<T, DbError>;
