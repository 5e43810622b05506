//! SQL text and parameter binding
//!
//! Identifiers come from code-declared [`RecordSpecification`]s only, which
//! reject anything but plain identifiers. Values are always bound.

use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use std::collections::BTreeMap;

use super::error::{PersistenceError, PersistenceResult};
use crate::clock::{from_millis, to_millis};
use crate::record::{
    Decimal, FieldSpecification, FieldType, FieldValue, Record, RecordSpecification,
    RecordWithMetadata,
};

pub const PID: &str = "PID";
pub const VALID_FROM: &str = "ValidFrom";
pub const VALID_TO: &str = "ValidTo";
pub const MODIFIED_DATE: &str = "ModifiedDate";

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn key_match(column: &str, key_is_null: bool) -> String {
    if key_is_null {
        format!("{} IS NULL", column)
    } else {
        format!("{} = ?", column)
    }
}

pub(crate) fn key_field(spec: &RecordSpecification) -> PersistenceResult<&FieldSpecification> {
    spec.field(spec.key_column())
        .ok_or_else(|| PersistenceError::UnknownColumn {
            table: spec.table().to_string(),
            column: spec.key_column().to_string(),
        })
}

pub(crate) fn insert_sql(spec: &RecordSpecification) -> String {
    let mut columns: Vec<&str> = spec.persisted_fields().map(FieldSpecification::name).collect();
    columns.extend([VALID_FROM, VALID_TO, MODIFIED_DATE]);

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        spec.table(),
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    )
}

pub(crate) fn update_sql(spec: &RecordSpecification) -> String {
    let assignments: Vec<String> = spec
        .persisted_fields()
        .map(FieldSpecification::name)
        .chain([VALID_FROM, VALID_TO, MODIFIED_DATE])
        .map(|column| format!("{} = ?", column))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE {} = ?",
        spec.table(),
        assignments.join(", "),
        PID
    )
}

/// Close rows for a key unless they already closed before the given instant
pub(crate) fn terminate_sql(spec: &RecordSpecification, key_is_null: bool) -> String {
    format!(
        "UPDATE {} SET {} = ?, {} = ? WHERE {} AND ({} IS NULL OR {} >= ?)",
        spec.table(),
        VALID_TO,
        MODIFIED_DATE,
        key_match(spec.key_column(), key_is_null),
        VALID_TO,
        VALID_TO
    )
}

pub(crate) fn select_current_sql(
    spec: &RecordSpecification,
    column: &str,
    key_is_null: bool,
) -> String {
    let mut columns = vec![PID];
    columns.extend(spec.persisted_fields().map(FieldSpecification::name));
    columns.extend([VALID_FROM, VALID_TO, MODIFIED_DATE]);

    format!(
        "SELECT {} FROM {} WHERE {} AND {} <= ? AND ({} IS NULL OR {} > ?)",
        columns.join(", "),
        spec.table(),
        key_match(column, key_is_null),
        VALID_FROM,
        VALID_TO,
        VALID_TO
    )
}

/// Bind one value, checked against the field's semantic type
pub(crate) fn bind_value<'q>(
    query: SqliteQuery<'q>,
    field: &FieldSpecification,
    value: &FieldValue,
) -> PersistenceResult<SqliteQuery<'q>> {
    if !value.fits(field.field_type()) {
        return Err(PersistenceError::BindTypeMismatch {
            column: field.name().to_string(),
            expected: field.field_type(),
            actual: value.kind(),
        });
    }

    Ok(match (value, field.field_type()) {
        (FieldValue::Text(text), _) => query.bind(text.clone()),
        (FieldValue::Integer(i), _) => query.bind(*i),
        (FieldValue::Decimal(d), _) => query.bind(d.to_f64()),
        (FieldValue::DateTime(t), _) => query.bind(to_millis(*t)),
        (FieldValue::Null, FieldType::Text) => query.bind(None::<String>),
        (FieldValue::Null, FieldType::Integer | FieldType::DateTime) => query.bind(None::<i64>),
        (FieldValue::Null, FieldType::Decimal) => query.bind(None::<f64>),
    })
}

/// Bind every persisted field in declared order
pub(crate) fn bind_record<'q>(
    mut query: SqliteQuery<'q>,
    spec: &RecordSpecification,
    record: &Record,
) -> PersistenceResult<SqliteQuery<'q>> {
    for field in spec.persisted_fields() {
        query = bind_value(query, field, record.value_or_null(field.name()))?;
    }
    Ok(query)
}

pub(crate) fn bind_period<'q>(
    query: SqliteQuery<'q>,
    valid_from: DateTime<Utc>,
    valid_to: Option<DateTime<Utc>>,
    modified_date: DateTime<Utc>,
) -> SqliteQuery<'q> {
    query
        .bind(to_millis(valid_from))
        .bind(valid_to.map(to_millis))
        .bind(to_millis(modified_date))
}

/// Map a row selected by [`select_current_sql`]; null columns are left out of the record
pub(crate) fn read_row(
    row: &SqliteRow,
    spec: &RecordSpecification,
) -> PersistenceResult<RecordWithMetadata> {
    let mut values = BTreeMap::new();

    for field in spec.persisted_fields() {
        let name = field.name();
        let value = match field.field_type() {
            FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(FieldValue::Text),
            FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(FieldValue::Integer),
            FieldType::Decimal => match row.try_get::<Option<f64>, _>(name)? {
                Some(raw) => Some(FieldValue::Decimal(Decimal::from_f64(raw).ok_or_else(
                    || PersistenceError::Decode {
                        column: name.to_string(),
                        reason: format!("{} does not fit DECIMAL(10,3)", raw),
                    },
                )?)),
                None => None,
            },
            FieldType::DateTime => row
                .try_get::<Option<i64>, _>(name)?
                .map(|millis| FieldValue::DateTime(from_millis(millis))),
        };

        if let Some(value) = value {
            values.insert(name.to_string(), value);
        }
    }

    Ok(RecordWithMetadata {
        pid: Some(row.try_get(PID)?),
        record: Record::from_values(values),
        valid_from: from_millis(row.try_get(VALID_FROM)?),
        valid_to: row.try_get::<Option<i64>, _>(VALID_TO)?.map(from_millis),
        modified_date: Some(from_millis(row.try_get(MODIFIED_DATE)?)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn spec() -> RecordSpecification {
        RecordSpecification::new(
            "Person",
            "CPR",
            vec![
                FieldSpecification::field("CPR", 10),
                FieldSpecification::field("Name", 20),
                FieldSpecification::field("Age", 3).as_integer().not_persisted(),
                FieldSpecification::filler("Pad", 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_insert_sql_lists_persisted_columns() {
        assert_eq!(
            insert_sql(&spec()),
            "INSERT INTO Person (CPR, Name, ValidFrom, ValidTo, ModifiedDate) VALUES (?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_update_sql_is_addressed_by_pid() {
        assert_eq!(
            update_sql(&spec()),
            "UPDATE Person SET CPR = ?, Name = ?, ValidFrom = ?, ValidTo = ?, ModifiedDate = ? WHERE PID = ?"
        );
    }

    #[test]
    fn test_null_keys_use_is_null() {
        let sql = select_current_sql(&spec(), "CPR", true);
        assert!(sql.contains("WHERE CPR IS NULL AND ValidFrom <= ?"));

        let sql = terminate_sql(&spec(), false);
        assert_eq!(
            sql,
            "UPDATE Person SET ValidTo = ?, ModifiedDate = ? WHERE CPR = ? AND (ValidTo IS NULL OR ValidTo >= ?)"
        );
    }

    #[test]
    fn test_bind_rejects_wrong_type() {
        let field = FieldSpecification::field("Age", 3).as_integer();
        let result = bind_value(sqlx::query("SELECT ?"), &field, &FieldValue::from("x"));

        assert!(matches!(
            result,
            Err(PersistenceError::BindTypeMismatch { expected: FieldType::Integer, .. })
        ));
    }
}
