//! Statement outcome in `subrc`/`dbcnt` terms.

use serde::{Deserialize, Serialize};

/// Statement succeeded.
pub const SUBRC_OK: i32 = 0;
/// No row matched, or the mutation failed.
pub const SUBRC_NOT_FOUND: i32 = 4;

/// Outcome of an INSERT, UPDATE or DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// Return code
    pub subrc: i32,
    /// Affected row count
    pub dbcnt: i64,
}

impl MutationOutcome {
    /// Successful outcome affecting `dbcnt` rows.
    pub fn ok(dbcnt: i64) -> Self {
        Self {
            subrc: SUBRC_OK,
            dbcnt,
        }
    }

    /// No rows affected.
    pub fn not_found() -> Self {
        Self {
            subrc: SUBRC_NOT_FOUND,
            dbcnt: 0,
        }
    }

    /// Derive the outcome from a backend-reported affected-row count.
    pub fn from_count(count: u64) -> Self {
        if count == 0 {
            Self::not_found()
        } else {
            Self::ok(i64::try_from(count).unwrap_or(i64::MAX))
        }
    }

    /// Check if the statement succeeded.
    pub fn is_ok(&self) -> bool {
        self.subrc == SUBRC_OK
    }

    /// Check if no rows were affected.
    pub fn is_not_found(&self) -> bool {
        self.subrc == SUBRC_NOT_FOUND
    }
}
