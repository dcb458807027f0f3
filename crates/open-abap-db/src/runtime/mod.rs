//! Open SQL runtime.
//!
//! This module provides runtime support for executing Open SQL statements
//! issued by compiled business logic against a relational backend.

mod async_session;
mod backend;
mod condition;
mod cursor;
mod session;
mod status;
mod transaction;
mod translate;
mod types;

pub use async_session::AsyncSession;
pub use backend::{Backend, BackendError, FaultKind, SqliteBackend};
pub use condition::{Condition, ConditionMapper, DynamicOsqlSemantics, DYNAMIC_OSQL_SEMANTICS};
pub use cursor::{Cursor, CursorState, FetchResult};
pub use session::{
    DeleteOptions, InsertOptions, SelectOptions, SelectResult, Session, SqlScript, UpdateOptions,
    TRACE_TARGET,
};
pub use status::{MutationOutcome, SUBRC_NOT_FOUND, SUBRC_OK};
pub use transaction::{TransactionManager, TransactionState};
pub use translate::OpenSqlTranslator;
pub use types::{SqlRow, SqlValue};
