use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::error::{RecordError, RecordResult};
use super::spec::{check_value, RecordSpecification};
use super::value::FieldValue;

static NULL: FieldValue = FieldValue::Null;

/// Immutable mapping from field name to value
///
/// Built through [`RecordBuilder`], which checks every value against a
/// [`RecordSpecification`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub(crate) fn from_values(values: BTreeMap<String, FieldValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// The value of `name`, or null when absent
    pub fn value_or_null(&self, name: &str) -> &FieldValue {
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Incremental, type-checked construction of a [`Record`]
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    spec: &'a RecordSpecification,
    values: BTreeMap<String, FieldValue>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(spec: &'a RecordSpecification) -> Self {
        Self {
            spec,
            values: BTreeMap::new(),
        }
    }

    /// Continue from an existing record, typically to fill in computed fields
    pub fn from_record(spec: &'a RecordSpecification, record: Record) -> Self {
        Self {
            spec,
            values: record.values,
        }
    }

    /// Set a field, rejecting unknown names, ignored fields and type mismatches
    pub fn field(mut self, name: &str, value: impl Into<FieldValue>) -> RecordResult<Self> {
        let field = self
            .spec
            .field(name)
            .ok_or_else(|| RecordError::UnknownField(name.to_string()))?;
        let value = value.into();
        check_value(field, &value)?;

        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn build(self) -> RecordResult<Record> {
        let record = Record::from_values(self.values);
        self.spec.validate(&record)?;
        Ok(record)
    }
}

/// One physical row version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWithMetadata {
    /// Engine-assigned surrogate id, `None` until persisted
    pub pid: Option<i64>,
    pub record: Record,
    pub valid_from: DateTime<Utc>,
    /// `None` means open-ended
    pub valid_to: Option<DateTime<Utc>>,
    /// Stamped by the persister on every write
    pub modified_date: Option<DateTime<Utc>>,
}

impl RecordWithMetadata {
    pub fn new(
        record: Record,
        valid_from: DateTime<Utc>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            pid: None,
            record,
            valid_from,
            valid_to,
            modified_date: None,
        }
    }

    /// Whether this version is valid at `instant`
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.valid_from <= instant && self.valid_to.map_or(true, |to| to > instant)
    }
}
