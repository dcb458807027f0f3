//! Async wrapper around [`Session`].
//!
//! Each call locks the session and runs the backend round trip on the
//! blocking pool. Calls on one session complete one at a time, in the order
//! they acquired the lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::SessionConfig;
use crate::runtime::{
    Backend, ConditionMapper, Cursor, DeleteOptions, InsertOptions, MutationOutcome,
    SelectOptions, SelectResult, Session, SqlScript, SqliteBackend, TransactionState,
    UpdateOptions,
};
use crate::{DbError, DbResult};

/// Shared, async handle to a session.
pub struct AsyncSession<B: Backend + 'static = SqliteBackend> {
    inner: Arc<Mutex<Session<B>>>,
}

impl<B: Backend + 'static> Clone for AsyncSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend + 'static> std::fmt::Debug for AsyncSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession").finish_non_exhaustive()
    }
}

impl<B: Backend + 'static> From<Session<B>> for AsyncSession<B> {
    fn from(session: Session<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }
}

impl<B: Backend + 'static> AsyncSession<B> {
    /// Create a new, unconnected session.
    pub fn new(config: SessionConfig) -> Self {
        Session::new(config).into()
    }

    /// Create a session that raises query faults through `mapper`.
    pub fn with_condition_mapper(
        config: SessionConfig,
        mapper: impl ConditionMapper + 'static,
    ) -> Self {
        Session::new(config).with_condition_mapper(mapper).into()
    }

    /// Run `f` against the session on the blocking pool.
    async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session<B>) -> DbResult<T> + Send + 'static,
    {
        let mut session = Arc::clone(&self.inner).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut session))
            .await
            .map_err(|e| {
                debug!(error = %e, "Session worker failed");
                DbError::Join(e.to_string())
            })?
    }

    /// Open the backend handle, replacing any existing one.
    pub async fn connect(&self) -> DbResult<()> {
        self.run(|s| s.connect()).await
    }

    /// Release the backend handle.
    pub async fn disconnect(&self) -> DbResult<()> {
        self.run(|s| s.disconnect()).await
    }

    /// Check if a backend handle is live.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_connected()
    }

    /// Database system name, once connected.
    pub async fn dbsys(&self) -> Option<&'static str> {
        self.inner.lock().await.dbsys()
    }

    /// Logical context name.
    pub async fn context(&self) -> String {
        self.inner.lock().await.context().to_string()
    }

    /// Current transaction state.
    pub async fn transaction_state(&self) -> TransactionState {
        self.inner.lock().await.transaction_state()
    }

    /// Run raw SQL.
    pub async fn execute(&self, sql: impl Into<SqlScript>) -> DbResult<()> {
        let sql = sql.into();
        self.run(move |s| s.execute(sql)).await
    }

    /// Run an Open SQL SELECT.
    pub async fn select(&self, options: SelectOptions) -> DbResult<SelectResult> {
        self.run(move |s| s.select(&options)).await
    }

    /// Run a SELECT and open a cursor over its result.
    pub async fn open_cursor(&self, options: SelectOptions) -> DbResult<Cursor> {
        self.run(move |s| s.open_cursor(&options)).await
    }

    /// Run an INSERT.
    pub async fn insert(&self, options: InsertOptions) -> DbResult<MutationOutcome> {
        self.run(move |s| s.insert(&options)).await
    }

    /// Run an UPDATE.
    pub async fn update(&self, options: UpdateOptions) -> DbResult<MutationOutcome> {
        self.run(move |s| s.update(&options)).await
    }

    /// Run a DELETE.
    pub async fn delete(&self, options: DeleteOptions) -> DbResult<MutationOutcome> {
        self.run(move |s| s.delete(&options)).await
    }

    /// Begin a transaction.
    pub async fn begin_transaction(&self) -> DbResult<()> {
        self.run(|s| s.begin_transaction()).await
    }

    /// Commit the current transaction.
    pub async fn commit(&self) -> DbResult<()> {
        self.run(|s| s.commit()).await
    }

    /// Roll back the current transaction.
    pub async fn rollback(&self) -> DbResult<()> {
        self.run(|s| s.rollback()).await
    }
}
