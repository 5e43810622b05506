//! Record specifications

use super::error::{RecordError, RecordResult};
use super::field::{FieldSpecification, FieldType};
use super::builder::Record;
use super::value::FieldValue;

/// Table layout and fixed-width line layout of one register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpecification {
    table: String,
    key_column: String,
    fields: Vec<FieldSpecification>,
}

impl RecordSpecification {
    /// Declare a specification
    ///
    /// Table, key column and field names end up in SQL text, so they must be
    /// plain identifiers. The key column must name a persisted field.
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        fields: Vec<FieldSpecification>,
    ) -> RecordResult<Self> {
        let table = table.into();
        let key_column = key_column.into();

        if !is_identifier(&table) {
            return Err(RecordError::invalid_spec(format!(
                "'{}' is not a valid table name",
                table
            )));
        }

        for (i, field) in fields.iter().enumerate() {
            if !is_identifier(field.name()) {
                return Err(RecordError::invalid_spec(format!(
                    "'{}' is not a valid field name",
                    field.name()
                )));
            }
            if fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(RecordError::invalid_spec(format!(
                    "field '{}' is declared twice",
                    field.name()
                )));
            }
        }

        let key_is_persisted = fields
            .iter()
            .any(|f| f.name() == key_column && f.is_persisted());
        if !key_is_persisted {
            return Err(RecordError::invalid_spec(format!(
                "key column '{}' must be a persisted field of '{}'",
                key_column, table
            )));
        }

        Ok(Self {
            table,
            key_column,
            fields,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn fields(&self) -> &[FieldSpecification] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpecification> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Fields written to the table, in declared order
    pub fn persisted_fields(&self) -> impl Iterator<Item = &FieldSpecification> {
        self.fields.iter().filter(|f| f.is_persisted())
    }

    /// Expected input line width
    pub fn total_width(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| !f.is_computed())
            .map(FieldSpecification::width)
            .sum()
    }

    /// Check a record against this specification, reporting the first violation
    pub fn validate(&self, record: &Record) -> RecordResult<()> {
        for (name, value) in record.iter() {
            let field = self
                .field(name)
                .ok_or_else(|| RecordError::UnknownField(name.to_string()))?;
            check_value(field, value)?;
        }

        for field in self.persisted_fields().filter(|f| !f.is_optional()) {
            if record.get(field.name()).map_or(true, FieldValue::is_null) {
                return Err(RecordError::MissingField(field.name().to_string()));
            }
        }

        Ok(())
    }

    pub fn conforms_to(&self, record: &Record) -> bool {
        self.validate(record).is_ok()
    }

    /// Field-for-field equality over persisted fields; an absent field equals null
    pub fn same_persisted_values(&self, a: &Record, b: &Record) -> bool {
        self.persisted_fields()
            .all(|f| a.value_or_null(f.name()) == b.value_or_null(f.name()))
    }
}

pub(crate) fn check_value(field: &FieldSpecification, value: &FieldValue) -> RecordResult<()> {
    if field.is_ignored() {
        return Err(RecordError::IgnoredField(field.name().to_string()));
    }

    if !value.fits(field.field_type()) {
        return Err(RecordError::TypeMismatch {
            field: field.name().to_string(),
            expected: field.field_type(),
            actual: value.kind(),
        });
    }

    if let (FieldType::Text, Some(text)) = (field.field_type(), value.as_text()) {
        let actual = text.chars().count();
        if actual > field.width() {
            return Err(RecordError::TooWide {
                field: field.name().to_string(),
                width: field.width(),
                actual,
            });
        }
    }

    Ok(())
}

/// ASCII letter or underscore, then letters, digits or underscores
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
