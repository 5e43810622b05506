//! Field specifications
//!
//! A field is declared once in code and derived with the `as_*` / flag
//! methods, each of which returns a new specification:
//!
//! ```
//! use stamdata_core::record::FieldSpecification;
//!
//! let cpr = FieldSpecification::field("CPR", 10);
//! let amount = FieldSpecification::field("Amount", 11).as_decimal().as_optional();
//! let spacer = FieldSpecification::filler("Reserved", 4);
//! # assert!(cpr.is_persisted() && !spacer.is_persisted() && amount.is_optional());
//! ```

use std::fmt;

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    /// DECIMAL(10,3)
    Decimal,
    DateTime,
}

impl FieldType {
    /// SQLite column type used for this field
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Decimal => "REAL",
            // epoch milliseconds
            FieldType::DateTime => "INTEGER",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Decimal => write!(f, "decimal"),
            FieldType::DateTime => write!(f, "datetime"),
        }
    }
}

/// One fixed-width field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpecification {
    name: String,
    field_type: FieldType,
    width: usize,
    persisted: bool,
    optional: bool,
    ignored: bool,
    computed: bool,
}

impl FieldSpecification {
    /// A required, persisted text field
    pub fn field(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Text,
            width,
            persisted: true,
            optional: false,
            ignored: false,
            computed: false,
        }
    }

    /// Filler consumed while decoding and never stored
    pub fn filler(name: impl Into<String>, width: usize) -> Self {
        Self::field(name, width).ignored()
    }

    pub fn as_integer(self) -> Self {
        self.with_type(FieldType::Integer)
    }

    pub fn as_decimal(self) -> Self {
        self.with_type(FieldType::Decimal)
    }

    pub fn as_datetime(self) -> Self {
        self.with_type(FieldType::DateTime)
    }

    pub fn as_optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// Decoded into the record but never written to the table
    pub fn not_persisted(self) -> Self {
        Self {
            persisted: false,
            ..self
        }
    }

    pub fn ignored(self) -> Self {
        Self {
            ignored: true,
            persisted: false,
            optional: true,
            ..self
        }
    }

    /// Not present in the input line; set programmatically after decoding
    pub fn computed(self) -> Self {
        Self {
            computed: true,
            optional: true,
            ..self
        }
    }

    fn with_type(self, field_type: FieldType) -> Self {
        Self { field_type, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }
}
