use thiserror::Error;

use super::field::FieldType;

pub type RecordResult<T> = Result<T, RecordError>;

/// Decode and validation failures, local to one input line or record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Line is {actual} characters long, expected exactly {expected}")]
    LineLength { expected: usize, actual: usize },

    #[error("Field '{field}' at offset {offset} has invalid value '{raw}': {reason}")]
    FieldParse {
        field: String,
        offset: usize,
        raw: String,
        reason: String,
    },

    #[error("Field '{0}' is not part of the record specification")]
    UnknownField(String),

    #[error("Field '{0}' is ignored and cannot carry a value")]
    IgnoredField(String),

    #[error("Field '{field}' holds {actual}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("Field '{field}' is {actual} characters wide, at most {width} allowed")]
    TooWide {
        field: String,
        width: usize,
        actual: usize,
    },

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("'{0}' is not a valid DECIMAL(10,3) value")]
    InvalidDecimal(String),

    #[error("Invalid record specification: {0}")]
    InvalidSpecification(String),
}

impl RecordError {
    pub(crate) fn field_parse(
        field: &str,
        offset: usize,
        raw: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::FieldParse {
            field: field.to_string(),
            offset,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpecification(msg.into())
    }
}
