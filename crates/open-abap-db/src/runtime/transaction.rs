//! Transaction management for Open SQL sessions.
//!
//! Provides BEGIN, COMMIT and ROLLBACK on the backend's native primitives.

use tracing::debug;

use crate::runtime::Backend;
use crate::DbResult;

/// Transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No active transaction; statements autocommit
    Inactive,
    /// Transaction in progress
    Active,
}

/// Transaction manager for one session.
#[derive(Debug)]
pub struct TransactionManager {
    /// Current transaction state
    state: TransactionState,
    /// Number of statements in current transaction
    statement_count: usize,
}

impl TransactionManager {
    /// Create a new transaction manager.
    pub fn new() -> Self {
        Self {
            state: TransactionState::Inactive,
            statement_count: 0,
        }
    }

    /// Get current transaction state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Check if a transaction is active.
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Get number of statements in current transaction.
    pub fn statement_count(&self) -> usize {
        self.statement_count
    }

    /// Begin a transaction. Does nothing if one is already active.
    pub fn begin<B: Backend>(&mut self, backend: &mut B) -> DbResult<()> {
        self.sync(backend);
        if self.state == TransactionState::Active {
            debug!("BEGIN ignored, transaction already active");
            return Ok(());
        }

        backend.begin()?;
        self.state = TransactionState::Active;
        self.statement_count = 0;
        debug!("Transaction started");
        Ok(())
    }

    /// Record that a SQL statement was executed.
    pub fn record_statement<B: Backend>(&mut self, backend: &B) {
        self.sync(backend);
        if self.state == TransactionState::Active {
            self.statement_count += 1;
        }
    }

    /// Commit the current transaction.
    ///
    /// Without an active transaction this succeeds without touching the
    /// backend.
    pub fn commit<B: Backend>(&mut self, backend: &mut B) -> DbResult<()> {
        self.sync(backend);
        if self.state != TransactionState::Active {
            return Ok(());
        }

        backend.commit()?;
        debug!(statements = self.statement_count, "Transaction committed");
        self.reset();
        Ok(())
    }

    /// Roll back the current transaction.
    pub fn rollback<B: Backend>(&mut self, backend: &mut B) -> DbResult<()> {
        self.sync(backend);
        if self.state != TransactionState::Active {
            return Ok(());
        }

        let result = backend.rollback();
        debug!(statements = self.statement_count, "Transaction rolled back");
        self.sync(backend);
        result.map_err(Into::into)
    }

    /// Forget any transaction, e.g. after the handle was replaced.
    pub fn reset(&mut self) {
        self.state = TransactionState::Inactive;
        self.statement_count = 0;
    }

    /// Pick up BEGIN/COMMIT issued as raw SQL.
    fn sync<B: Backend>(&mut self, backend: &B) {
        match (self.state, backend.in_transaction()) {
            (TransactionState::Inactive, true) => {
                self.state = TransactionState::Active;
                self.statement_count = 0;
            }
            (TransactionState::Active, false) => self.reset(),
            _ => {}
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
