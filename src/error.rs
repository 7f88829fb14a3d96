//! Error taxonomy for the aggregation core.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("operation requires at least one record")]
    EmptyInput,

    #[error("group '{0}' is empty")]
    EmptyGroup(String),

    #[error("column '{column}' holds non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("record {row} does not match the table schema: {reason}")]
    SchemaMismatch { row: usize, reason: String },

    #[error("invalid bucket range '{label}': {reason}")]
    InvalidBucket { label: String, reason: String },

    #[error("invalid condition '{0}'")]
    InvalidCondition(String),
}

pub type AggregateResult<T> = Result<T, AggregateError>;
