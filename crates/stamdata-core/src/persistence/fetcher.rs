use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::error::{PersistenceError, PersistenceResult};
use super::statements::{bind_value, read_row, select_current_sql};
use crate::clock::{to_millis, truncate_to_millis};
use crate::record::{FieldValue, Record, RecordSpecification, RecordWithMetadata};

/// As-of lookups sharing the run's transaction time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFetcher {
    transaction_time: DateTime<Utc>,
}

impl RecordFetcher {
    pub fn new(transaction_time: DateTime<Utc>) -> Self {
        Self {
            transaction_time: truncate_to_millis(transaction_time),
        }
    }

    pub fn transaction_time(&self) -> DateTime<Utc> {
        self.transaction_time
    }

    /// The record currently valid for `key` in the key column
    pub async fn fetch_current(
        &self,
        conn: &mut SqliteConnection,
        key: &FieldValue,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<Record>> {
        self.fetch_current_by(conn, key, spec, spec.key_column()).await
    }

    /// The record currently valid for `key` in an arbitrary persisted column
    pub async fn fetch_current_by(
        &self,
        conn: &mut SqliteConnection,
        key: &FieldValue,
        spec: &RecordSpecification,
        lookup_column: &str,
    ) -> PersistenceResult<Option<Record>> {
        Ok(self
            .fetch_by_at(conn, key, spec, lookup_column, self.transaction_time)
            .await?
            .map(|row| row.record))
    }

    pub async fn fetch_current_with_meta(
        &self,
        conn: &mut SqliteConnection,
        key: &FieldValue,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<RecordWithMetadata>> {
        self.fetch_by_at(conn, key, spec, spec.key_column(), self.transaction_time)
            .await
    }

    pub async fn fetch_with_meta_at(
        &self,
        conn: &mut SqliteConnection,
        key: &FieldValue,
        as_of: DateTime<Utc>,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<RecordWithMetadata>> {
        self.fetch_by_at(conn, key, spec, spec.key_column(), as_of).await
    }

    /// Row valid at `as_of` for `key` in `lookup_column`
    ///
    /// A null key matches rows where the column is NULL. More than one
    /// matching row is a data-integrity error.
    pub async fn fetch_by_at(
        &self,
        conn: &mut SqliteConnection,
        key: &FieldValue,
        spec: &RecordSpecification,
        lookup_column: &str,
        as_of: DateTime<Utc>,
    ) -> PersistenceResult<Option<RecordWithMetadata>> {
        let column = spec
            .persisted_fields()
            .find(|f| f.name() == lookup_column)
            .ok_or_else(|| PersistenceError::UnknownColumn {
                table: spec.table().to_string(),
                column: lookup_column.to_string(),
            })?;

        let sql = select_current_sql(spec, lookup_column, key.is_null());
        let mut query = sqlx::query(&sql);
        if !key.is_null() {
            query = bind_value(query, column, key)?;
        }
        let as_of = to_millis(as_of);

        let rows = query.bind(as_of).bind(as_of).fetch_all(&mut *conn).await?;

        match rows.as_slice() {
            [] => Ok(None),
            [row] => read_row(row, spec).map(Some),
            _ => Err(PersistenceError::MultipleCurrentRows {
                table: spec.table().to_string(),
                column: lookup_column.to_string(),
                key: key.to_string(),
                count: rows.len(),
            }),
        }
    }
}
