//! Cursor over a materialized query result.
//!
//! The full result set is read when the cursor is opened; fetching pages
//! through it never touches the backend again.

use serde::Serialize;

use crate::runtime::SqlRow;
use crate::{DbError, DbResult};

/// Cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Cursor is open and can be fetched
    Open,
    /// Cursor is closed
    Closed,
}

/// One page of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchResult {
    /// Rows in this page
    pub rows: Vec<SqlRow>,
}

impl FetchResult {
    /// Number of rows in the page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An open cursor.
#[derive(Debug, Clone)]
pub struct Cursor {
    /// Result rows
    rows: Vec<SqlRow>,
    /// Read offset; may run past the end
    offset: usize,
    /// Current state
    state: CursorState,
}

impl Cursor {
    /// Open a cursor over `rows`.
    pub fn new(rows: Vec<SqlRow>) -> Self {
        Self {
            rows,
            offset: 0,
            state: CursorState::Open,
        }
    }

    /// Fetch the next `page_size` rows.
    ///
    /// The offset always advances by `page_size`, even when fewer rows were
    /// left, so once exhausted every further fetch returns an empty page.
    pub fn fetch_next_cursor(&mut self, page_size: usize) -> DbResult<FetchResult> {
        if self.state == CursorState::Closed {
            return Err(DbError::CursorClosed);
        }

        let start = self.offset.min(self.rows.len());
        let end = self.offset.saturating_add(page_size).min(self.rows.len());
        let rows = self.rows[start..end].to_vec();

        self.offset = self.offset.saturating_add(page_size);

        Ok(FetchResult { rows })
    }

    /// Close the cursor. Closing twice is allowed.
    pub fn close_cursor(&mut self) -> DbResult<()> {
        self.state = CursorState::Closed;
        Ok(())
    }

    /// Get cursor state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Check if cursor is open.
    pub fn is_open(&self) -> bool {
        self.state == CursorState::Open
    }

    /// Current read offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of materialized rows.
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Check if every row has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.rows.len()
    }
}
