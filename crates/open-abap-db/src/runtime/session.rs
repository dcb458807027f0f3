//! Open SQL session: the calling surface used by compiled business logic.
//!
//! A session owns at most one backend handle. Statements are translated,
//! optionally traced, executed, and their outcome reported the way the
//! source runtime does: mutations as `subrc`/`dbcnt`, queries as rows or a
//! raised condition.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::runtime::{
    Backend, BackendError, ConditionMapper, Cursor, MutationOutcome, OpenSqlTranslator,
    SqlRow, SqliteBackend, TransactionManager, TransactionState,
};
use crate::{DbError, DbResult};

/// Tracing target that receives the final SQL text when tracing is on.
pub const TRACE_TARGET: &str = "open_abap_db::trace";

/// Options for SELECT and cursor OPEN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOptions {
    /// Open SQL SELECT statement
    pub select: String,
    /// Primary key columns, used for `ORDER BY PRIMARY KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
}

impl SelectOptions {
    /// Create options for a SELECT statement.
    pub fn new(select: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            primary_key: None,
        }
    }

    /// Set the primary key columns.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Rows returned by a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectResult {
    /// Result rows in backend order
    pub rows: Vec<SqlRow>,
}

/// Options for INSERT.
///
/// Values are SQL literals formatted by the caller and are not escaped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertOptions {
    /// Target table
    pub table: String,
    /// Column names
    pub columns: Vec<String>,
    /// Value literals, one per column
    pub values: Vec<String>,
}

impl InsertOptions {
    /// Create INSERT options.
    pub fn new<C, V>(table: impl Into<String>, columns: C, values: V) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Options for UPDATE.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Target table
    pub table: String,
    /// `col = expr` assignments
    pub set: Vec<String>,
    /// Predicate
    #[serde(rename = "where")]
    pub where_clause: String,
}

impl UpdateOptions {
    /// Create UPDATE options.
    pub fn new<S>(table: impl Into<String>, set: S, where_clause: impl Into<String>) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            table: table.into(),
            set: set.into_iter().map(Into::into).collect(),
            where_clause: where_clause.into(),
        }
    }
}

/// Options for DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Target table
    pub table: String,
    /// Predicate
    #[serde(rename = "where")]
    pub where_clause: String,
}

impl DeleteOptions {
    /// Create DELETE options.
    pub fn new(table: impl Into<String>, where_clause: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: where_clause.into(),
        }
    }
}

/// Raw SQL for [`Session::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlScript {
    /// One script; may hold several `;`-separated statements
    Single(String),
    /// Scripts run one after another
    Batch(Vec<String>),
}

impl From<&str> for SqlScript {
    fn from(sql: &str) -> Self {
        SqlScript::Single(sql.to_string())
    }
}

impl From<String> for SqlScript {
    fn from(sql: String) -> Self {
        SqlScript::Single(sql)
    }
}

impl From<Vec<String>> for SqlScript {
    fn from(sql: Vec<String>) -> Self {
        SqlScript::Batch(sql)
    }
}

impl From<Vec<&str>> for SqlScript {
    fn from(sql: Vec<&str>) -> Self {
        SqlScript::Batch(sql.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for SqlScript {
    fn from(sql: &[&str]) -> Self {
        SqlScript::Batch(sql.iter().map(|s| s.to_string()).collect())
    }
}

/// A logical database session.
///
/// The caller owns the session and passes it to whatever needs database
/// access; there is no process-wide registry.
pub struct Session<B: Backend = SqliteBackend> {
    /// Session configuration; fixed after construction
    config: SessionConfig,
    /// Live backend handle
    backend: Option<B>,
    /// Open SQL translator
    translator: OpenSqlTranslator,
    /// Transaction bookkeeping
    transactions: TransactionManager,
    /// Query fault to condition mapping
    mapper: Option<Arc<dyn ConditionMapper>>,
}

impl<B: Backend> fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("connected", &self.backend.is_some())
            .field("transactions", &self.transactions)
            .field("condition_mapper", &self.mapper.is_some())
            .finish()
    }
}

impl<B: Backend> Session<B> {
    /// Create a new session (does not connect immediately).
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            backend: None,
            translator: OpenSqlTranslator::new(),
            transactions: TransactionManager::new(),
            mapper: None,
        }
    }

    /// Install the mapping used to raise query faults as conditions.
    pub fn with_condition_mapper(mut self, mapper: impl ConditionMapper + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Logical context name.
    pub fn context(&self) -> &str {
        &self.config.context
    }

    /// Check if SQL tracing is on.
    pub fn trace_enabled(&self) -> bool {
        self.config.trace
    }

    /// Check if a backend handle is live.
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Database system name, once connected.
    pub fn dbsys(&self) -> Option<&'static str> {
        self.backend.as_ref().map(Backend::name)
    }

    /// Current transaction state.
    pub fn transaction_state(&self) -> TransactionState {
        self.transactions.state()
    }

    /// Transaction bookkeeping.
    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Borrow the backend handle.
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Open the backend handle, replacing any existing one.
    pub fn connect(&mut self) -> DbResult<()> {
        if self.backend.is_some() {
            debug!(context = %self.config.context, "Replacing existing connection");
            self.release();
        }

        let backend = B::open(&self.config)?;
        info!(
            context = %self.config.context,
            dbsys = backend.name(),
            "Database connected"
        );
        self.backend = Some(backend);
        self.transactions.reset();
        Ok(())
    }

    /// Release the backend handle, rolling back an open transaction.
    ///
    /// Statements issued afterwards fail with [`DbError::NotConnected`].
    pub fn disconnect(&mut self) -> DbResult<()> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };

        let rollback = self.transactions.rollback(&mut backend);
        self.transactions.reset();
        let close = backend.close();
        info!(context = %self.config.context, "Database disconnected");

        rollback?;
        close?;
        Ok(())
    }

    /// Run raw SQL. Empty strings are skipped; batches run in order and stop
    /// at the first failure.
    pub fn execute(&mut self, sql: impl Into<SqlScript>) -> DbResult<()> {
        match sql.into() {
            SqlScript::Single(sql) => self.execute_one(&sql),
            SqlScript::Batch(scripts) => {
                for sql in &scripts {
                    self.execute_one(sql)?;
                }
                Ok(())
            }
        }
    }

    fn execute_one(&mut self, sql: &str) -> DbResult<()> {
        if sql.is_empty() {
            return Ok(());
        }

        let backend = connected(&mut self.backend, &self.config.context)?;
        debug!(sql = %sql, "EXECUTE");
        backend.execute_batch(sql)?;
        self.transactions.record_statement(backend);
        Ok(())
    }

    /// Run an Open SQL SELECT and return every row.
    ///
    /// Backend faults are raised through the condition mapper when one is
    /// installed, otherwise propagated unchanged.
    pub fn select(&mut self, options: &SelectOptions) -> DbResult<SelectResult> {
        let sql = self
            .translator
            .translate_select(&options.select, options.primary_key.as_deref());
        self.trace(&sql);

        let backend = connected(&mut self.backend, &self.config.context)?;
        match backend.query(&sql) {
            Ok(rows) => Ok(SelectResult { rows }),
            Err(fault) => Err(self.raise(fault)),
        }
    }

    /// Run a SELECT and open a cursor over its result.
    pub fn open_cursor(&mut self, options: &SelectOptions) -> DbResult<Cursor> {
        let SelectResult { rows } = self.select(options)?;
        debug!(rows = rows.len(), "Cursor opened");
        Ok(Cursor::new(rows))
    }

    /// Run an INSERT.
    ///
    /// Any backend fault (e.g. a duplicate key) yields `subrc = 4`,
    /// `dbcnt = 0`. On success `dbcnt` is 1.
    pub fn insert(&mut self, options: &InsertOptions) -> DbResult<MutationOutcome> {
        let sql = self
            .translator
            .insert_sql(&options.table, &options.columns, &options.values);
        self.trace(&sql);

        let backend = connected(&mut self.backend, &self.config.context)?;
        let outcome = match backend.execute_batch(&sql) {
            Ok(()) => MutationOutcome::ok(1),
            Err(fault) => {
                if self.config.trace {
                    warn!(target: TRACE_TARGET, error = %fault, kind = ?fault.kind(), "INSERT failed");
                }
                MutationOutcome::not_found()
            }
        };
        self.transactions.record_statement(backend);
        Ok(outcome)
    }

    /// Run an UPDATE.
    pub fn update(&mut self, options: &UpdateOptions) -> DbResult<MutationOutcome> {
        let sql = self
            .translator
            .update_sql(&options.table, &options.set, &options.where_clause);
        self.run_mutation(&sql)
    }

    /// Run a DELETE.
    pub fn delete(&mut self, options: &DeleteOptions) -> DbResult<MutationOutcome> {
        let sql = self
            .translator
            .delete_sql(&options.table, &options.where_clause);
        self.run_mutation(&sql)
    }

    /// Execute an UPDATE/DELETE and fold the result into a status code.
    fn run_mutation(&mut self, sql: &str) -> DbResult<MutationOutcome> {
        self.trace(sql);

        let backend = connected(&mut self.backend, &self.config.context)?;
        let outcome = match backend.execute(sql) {
            Ok(count) => MutationOutcome::from_count(count),
            Err(fault) => {
                debug!(error = %fault, "Mutation failed");
                MutationOutcome::not_found()
            }
        };
        self.transactions.record_statement(backend);
        Ok(outcome)
    }

    /// Begin a transaction.
    pub fn begin_transaction(&mut self) -> DbResult<()> {
        let backend = connected(&mut self.backend, &self.config.context)?;
        self.transactions.begin(backend)
    }

    /// Commit the current transaction.
    pub fn commit(&mut self) -> DbResult<()> {
        let backend = connected(&mut self.backend, &self.config.context)?;
        self.transactions.commit(backend)
    }

    /// Roll back the current transaction.
    pub fn rollback(&mut self) -> DbResult<()> {
        let backend = connected(&mut self.backend, &self.config.context)?;
        self.transactions.rollback(backend)
    }

    fn trace(&self, sql: &str) {
        if self.config.trace {
            info!(target: TRACE_TARGET, "{}", sql);
        }
    }

    fn raise(&self, fault: BackendError) -> DbError {
        match &self.mapper {
            Some(mapper) => DbError::Condition(mapper.map_fault(&fault)),
            None => DbError::Backend(fault),
        }
    }

    /// Drop the current handle, logging instead of failing.
    fn release(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!(context = %self.config.context, error = %e, "Error while releasing connection");
        }
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        self.release();
    }
}

fn connected<'a, B>(backend: &'a mut Option<B>, context: &str) -> DbResult<&'a mut B> {
    backend.as_mut().ok_or_else(|| DbError::NotConnected {
        context: context.to_string(),
    })
}
