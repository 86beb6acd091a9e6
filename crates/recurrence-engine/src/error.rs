//! Error types for recurrence-engine operations.
//!
//! Only rule parsing and translation are fallible. Expansion never returns an
//! error: a broken rule degrades the event to a single passthrough instance and
//! the reason is reported as a [`crate::Diagnostic`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A valid RFC 5545 frequency the calendar model does not represent
    /// (`SECONDLY`, `MINUTELY`, `HOURLY`).
    #[error("Unsupported frequency: {0}")]
    UnsupportedFrequency(String),

    /// The rule text is missing a required part or carries an invalid value.
    #[error("Malformed rule: {0}")]
    MalformedRule(String),
}

impl RuleError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRule(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
