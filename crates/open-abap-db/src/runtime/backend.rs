//! Backend connection handling.
//!
//! The [`Backend`] trait is the seam to the relational engine; the shipped
//! implementation runs on embedded SQLite via `rusqlite`.

use std::error::Error as StdError;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use thiserror::Error;
use tracing::debug;

use crate::config::SessionConfig;
use crate::runtime::{SqlRow, SqlValue};

/// Classification of a backend fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Unique or primary key violation
    UniqueViolation,
    /// Any other integrity constraint (NOT NULL, CHECK, foreign key)
    ConstraintViolation,
    /// Table, view or column does not exist
    UndefinedObject,
    /// Statement could not be parsed
    Syntax,
    /// Database locked or busy
    Busy,
    /// Write attempted on a read-only database
    ReadOnly,
    /// Everything else
    Other,
}

impl FaultKind {
    /// DB2-style SQLCODE for this fault class.
    pub fn sqlcode(self) -> i32 {
        match self {
            FaultKind::UniqueViolation => -803,
            FaultKind::ConstraintViolation => -545,
            FaultKind::UndefinedObject => -204,
            FaultKind::Syntax => -104,
            FaultKind::Busy => -911,
            FaultKind::ReadOnly => -551,
            FaultKind::Other => -999,
        }
    }
}

/// A fault reported by the backend.
///
/// The engine's own error is kept as the `source`, so callers can still
/// downcast to it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    kind: FaultKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl BackendError {
    /// Create a fault without an underlying engine error.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a fault wrapping an engine error.
    pub fn with_source<E>(kind: FaultKind, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            kind,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Fault classification.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// The backend's message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Borrow the underlying engine error as a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        Self {
            kind: classify_sqlite_error(&err),
            message: sqlite_message(&err),
            source: Some(Box::new(err)),
        }
    }
}

/// A relational engine the session can drive.
///
/// Every method is a single synchronous round trip; callers needing
/// suspension run them on a blocking worker (see `AsyncSession`).
pub trait Backend: Send + Sized {
    /// Open a new handle.
    fn open(config: &SessionConfig) -> Result<Self, BackendError>;

    /// Database system name reported to the runtime.
    fn name(&self) -> &'static str;

    /// Run a script of one or more statements, discarding results.
    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError>;

    /// Prepare and run a single statement, returning the affected-row count.
    fn execute(&mut self, sql: &str) -> Result<u64, BackendError>;

    /// Prepare and run a query, materializing every row.
    fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>, BackendError>;

    /// Start a transaction.
    fn begin(&mut self) -> Result<(), BackendError> {
        self.execute_batch("BEGIN")
    }

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<(), BackendError> {
        self.execute_batch("COMMIT")
    }

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<(), BackendError> {
        self.execute_batch("ROLLBACK")
    }

    /// Whether a transaction is currently open on this handle.
    fn in_transaction(&self) -> bool;

    /// Release the handle.
    fn close(self) -> Result<(), BackendError>;
}

/// SQLite backend.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Access the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for SqliteBackend {
    fn open(config: &SessionConfig) -> Result<Self, BackendError> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database)?
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        debug!(database = %config.database, "Opened SQLite backend");
        Ok(Self { conn })
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        let mut stmt = self.conn.prepare(sql)?;
        let changes = stmt.execute([])?;
        Ok(changes as u64)
    }

    fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>, BackendError> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut sql_row = SqlRow::new();
            for (idx, name) in names.iter().enumerate() {
                sql_row.add_column(name, sqlite_value_to_sql_value(row.get_ref(idx)?));
            }
            result.push(sql_row);
        }

        Ok(result)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn close(self) -> Result<(), BackendError> {
        self.conn.close().map_err(|(_, e)| BackendError::from(e))
    }
}

/// Convert a single SQLite column value to `SqlValue`.
fn sqlite_value_to_sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(t) => SqlValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Binary(b.to_vec()),
    }
}

/// Map a rusqlite error to a fault class.
fn classify_sqlite_error(err: &rusqlite::Error) -> FaultKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            classify_failure(failure, message.as_deref().unwrap_or_default())
        }
        rusqlite::Error::SqlInputError { error, msg, .. } => classify_failure(error, msg),
        rusqlite::Error::InvalidColumnName(_) => FaultKind::UndefinedObject,
        _ => FaultKind::Other,
    }
}

fn classify_failure(failure: &rusqlite::ffi::Error, message: &str) -> FaultKind {
    match failure.code {
        ErrorCode::ConstraintViolation => match failure.extended_code {
            // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE
            1555 | 2067 => FaultKind::UniqueViolation,
            _ => FaultKind::ConstraintViolation,
        },
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => FaultKind::Busy,
        ErrorCode::ReadOnly => FaultKind::ReadOnly,
        _ => classify_message(message),
    }
}

/// The engine's own message text, without rusqlite's SQL/offset decoration.
fn sqlite_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        rusqlite::Error::SqlInputError { msg, .. } => msg.clone(),
        other => other.to_string(),
    }
}

/// SQLite reports prepare-time faults as generic errors; the message text
/// carries the distinction.
fn classify_message(message: &str) -> FaultKind {
    if message.starts_with("no such table")
        || message.starts_with("no such column")
        || message.starts_with("no such view")
    {
        FaultKind::UndefinedObject
    } else if message.contains("syntax error") || message.starts_with("incomplete input") {
        FaultKind::Syntax
    } else {
        FaultKind::Other
    }
}
