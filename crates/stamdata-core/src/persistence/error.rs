use thiserror::Error;

use crate::record::{FieldType, RecordError};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failures of the bitemporal persistence engine
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Record(#[from] RecordError),

    /// More than one row is valid for the same key at the same instant
    #[error("{count} rows in '{table}' are currently valid for {column} = {key}")]
    MultipleCurrentRows {
        table: String,
        column: String,
        key: String,
        count: usize,
    },

    #[error("Record for '{table}' has no PID and was never persisted")]
    MissingPid { table: String },

    #[error("No row with PID {pid} in '{table}'")]
    RowNotFound { table: String, pid: i64 },

    #[error("Cannot bind a {actual} value to {expected} column '{column}'")]
    BindTypeMismatch {
        column: String,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("'{column}' is not a persisted column of '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Column '{column}' holds an unreadable value: {reason}")]
    Decode { column: String, reason: String },
}
