//! Mapping of backend faults to typed conditions.
//!
//! Only query faults are eligible. The mapping is a capability the caller
//! installs on the session; without it, the backend fault propagates as is.

use miette::Diagnostic;
use thiserror::Error;

use crate::runtime::{BackendError, FaultKind};

/// Class name of the condition raised for failing dynamic Open SQL.
pub const DYNAMIC_OSQL_SEMANTICS: &str = "CX_SY_DYNAMIC_OSQL_SEMANTICS";

/// A catchable domain condition carrying backend diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{class}: {sqlmsg}")]
#[diagnostic(code(osql::condition))]
pub struct Condition {
    /// Condition class name
    pub class: String,
    /// Backend message text
    pub sqlmsg: String,
    /// DB2-style SQLCODE of the fault class
    pub sqlcode: i32,
    /// Fault classification
    pub kind: FaultKind,
}

impl Condition {
    /// Create a condition of `class` from a backend fault.
    pub fn from_fault(class: &str, fault: &BackendError) -> Self {
        Self {
            class: class.to_string(),
            sqlmsg: fault.message().to_string(),
            sqlcode: fault.kind().sqlcode(),
            kind: fault.kind(),
        }
    }

    /// Check the condition class, ignoring case.
    pub fn is_class(&self, class: &str) -> bool {
        self.class.eq_ignore_ascii_case(class)
    }
}

/// Wraps a backend fault into a domain condition.
pub trait ConditionMapper: Send + Sync {
    /// Build the condition raised for `fault`.
    fn map_fault(&self, fault: &BackendError) -> Condition;
}

impl<F> ConditionMapper for F
where
    F: Fn(&BackendError) -> Condition + Send + Sync,
{
    fn map_fault(&self, fault: &BackendError) -> Condition {
        self(fault)
    }
}

/// Raises `CX_SY_DYNAMIC_OSQL_SEMANTICS` with the backend message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicOsqlSemantics;

impl ConditionMapper for DynamicOsqlSemantics {
    fn map_fault(&self, fault: &BackendError) -> Condition {
        Condition::from_fault(DYNAMIC_OSQL_SEMANTICS, fault)
    }
}
