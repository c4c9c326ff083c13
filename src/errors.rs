use std::ops::Range;

use thiserror::Error;

/// Error type that captures ledger, budget, and persistence failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid value for `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("No entries recorded for {year}-{month:02}")]
    PeriodNotFound { year: i32, month: u32 },
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("Cannot merge account {found} into {expected}")]
    MergeMismatch { expected: String, found: String },
    #[error("Percentage undefined for {year}-{month:02}: goal is zero")]
    UndefinedPercentage { year: i32, month: u32 },
    #[error("No goal set for {year}-{month:02}")]
    GoalNotSet { year: i32, month: u32 },
    #[error("Amount overflow while summing entries")]
    AmountOverflow,
    #[error("Corrupt record #{record} at bytes {}..{}: {reason}", span.start, span.end)]
    CorruptRecord {
        record: usize,
        span: Range<usize>,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        LedgerError::InvalidField {
            field,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
