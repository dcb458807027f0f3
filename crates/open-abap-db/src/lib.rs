//! Open SQL execution engine for OpenABAP.
//!
//! This crate runs the embedded data-manipulation statements of compiled
//! business logic against a relational backend:
//! - Translating Open SQL SELECT clauses to the backend dialect
//! - Executing INSERT/UPDATE/DELETE with `subrc`/`dbcnt` status semantics
//! - Materialized, page-wise cursors
//! - Native transaction boundaries
//! - Mapping backend faults to typed conditions
//!
//! # Example
//!
//! ```ignore
//! use open_abap_db::{DeleteOptions, Session, SessionConfig};
//!
//! let mut session: Session = Session::new(SessionConfig::default());
//! session.connect()?;
//! session.execute("CREATE TABLE zfoo (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let outcome = session.delete(&DeleteOptions::new("zfoo", "id = 1"))?;
//! assert_eq!(outcome.subrc, 4);
//! ```

pub mod config;
pub mod error;
pub mod runtime;
pub mod tracing_setup;

pub use config::{ConfigError, SessionConfig};
pub use error::{DbError, DbResult};
pub use runtime::{
    AsyncSession, Backend, BackendError, Condition, ConditionMapper, Cursor, CursorState,
    DeleteOptions, DynamicOsqlSemantics, FaultKind, FetchResult, InsertOptions, MutationOutcome,
    OpenSqlTranslator, SelectOptions, SelectResult, Session, SqlRow, SqlScript, SqlValue,
    SqliteBackend, TransactionManager, TransactionState, UpdateOptions, SUBRC_NOT_FOUND,
    SUBRC_OK,
};
pub use tracing_setup::{init_tracing, LogFormat, TracingConfig, TracingError};
