//! Error types for the rollup engine and record store.

use crate::models::Month;

/// Why a record cannot take part in any aggregate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// A required identity field is empty or absent
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A numeric field holds NaN or an infinity
    #[error("non-finite value in `{0}`")]
    NonFiniteValue(&'static str),

    /// The row could not be decoded at all
    #[error("undecodable row: {0}")]
    Undecodable(String),
}

impl RecordError {
    pub(crate) fn non_finite_month(month: Month) -> Self {
        RecordError::NonFiniteValue(month.key())
    }
}

/// Record store failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(u64),

    /// Replacing a fiscal year with nothing would leave it without live data
    #[error("refusing to replace {0} with an empty dataset")]
    EmptyReplacement(String),

    #[error("project `{0}` already has live records")]
    AlreadyExists(String),

    #[error("invalid edit: {0}")]
    InvalidEdit(String),
}
