use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, trace};

use super::error::{PersistenceError, PersistenceResult};
use super::fetcher::RecordFetcher;
use super::statements::{
    bind_period, bind_record, bind_value, insert_sql, key_field, terminate_sql, update_sql,
};
use crate::clock::to_millis;
use crate::record::{Record, RecordSpecification, RecordWithMetadata};

/// Result of [`RecordPersister::persist_or_replace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No current row existed
    Inserted { pid: i64 },
    /// The current row already held the same values
    Unchanged { pid: i64 },
    /// The current row was closed and a new version opened
    Replaced { terminated: i64, inserted: i64 },
}

/// Bitemporal writes stamped with one pinned transaction time
///
/// Every row written through the same persister shares its `ModifiedDate`,
/// and every plain insert shares its `ValidFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPersister {
    fetcher: RecordFetcher,
}

impl RecordPersister {
    /// The transaction time is truncated to milliseconds
    pub fn new(transaction_time: DateTime<Utc>) -> Self {
        Self {
            fetcher: RecordFetcher::new(transaction_time),
        }
    }

    pub fn transaction_time(&self) -> DateTime<Utc> {
        self.fetcher.transaction_time()
    }

    /// Lookups seeing the same "now" as this persister
    pub fn fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    /// Append an open row valid from the transaction time
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        let row = RecordWithMetadata::new(record.clone(), self.transaction_time(), None);
        self.insert_with_meta(conn, &row, spec).await
    }

    /// Append a row with explicit validity; `ModifiedDate` is always the transaction time
    pub async fn insert_with_meta(
        &self,
        conn: &mut SqliteConnection,
        row: &RecordWithMetadata,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        let pid = self.insert_row(conn, row, spec).await?;

        Ok(RecordWithMetadata {
            pid: Some(pid),
            modified_date: Some(self.transaction_time()),
            ..row.clone()
        })
    }

    async fn insert_row(
        &self,
        conn: &mut SqliteConnection,
        row: &RecordWithMetadata,
        spec: &RecordSpecification,
    ) -> PersistenceResult<i64> {
        spec.validate(&row.record)?;

        let sql = insert_sql(spec);
        let query = bind_record(sqlx::query(&sql), spec, &row.record)?;
        let pid = bind_period(query, row.valid_from, row.valid_to, self.transaction_time())
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

        trace!(table = spec.table(), pid, "Inserted row");
        Ok(pid)
    }

    /// Close the current row for the record's key at the transaction time
    pub async fn terminate(
        &self,
        conn: &mut SqliteConnection,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<u64> {
        self.terminate_at(conn, record, spec, self.transaction_time())
            .await
    }

    /// Close rows for the record's key at `when`
    ///
    /// Rows that already closed before `when` are left alone. Returns the
    /// number of row versions changed.
    pub async fn terminate_at(
        &self,
        conn: &mut SqliteConnection,
        record: &Record,
        spec: &RecordSpecification,
        when: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let key = record.value_or_null(spec.key_column());
        let sql = terminate_sql(spec, key.is_null());

        let mut query = sqlx::query(&sql)
            .bind(to_millis(when))
            .bind(to_millis(self.transaction_time()));
        if !key.is_null() {
            query = bind_value(query, key_field(spec)?, key)?;
        }

        let closed = query
            .bind(to_millis(when))
            .execute(&mut *conn)
            .await?
            .rows_affected();

        debug!(table = spec.table(), key = %key, closed, "Terminated rows");
        Ok(closed)
    }

    /// Rewrite the row identified by `row.pid`
    pub async fn update(
        &self,
        conn: &mut SqliteConnection,
        row: &RecordWithMetadata,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        let pid = row.pid.ok_or_else(|| PersistenceError::MissingPid {
            table: spec.table().to_string(),
        })?;
        spec.validate(&row.record)?;

        let sql = update_sql(spec);
        let query = bind_record(sqlx::query(&sql), spec, &row.record)?;
        let updated = bind_period(query, row.valid_from, row.valid_to, self.transaction_time())
            .bind(pid)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(PersistenceError::RowNotFound {
                table: spec.table().to_string(),
                pid,
            });
        }

        Ok(RecordWithMetadata {
            modified_date: Some(self.transaction_time()),
            ..row.clone()
        })
    }

    /// Turn a full-snapshot record into version history
    ///
    /// Inserts when no row is current for the key, does nothing when the
    /// current row holds the same persisted values, and otherwise closes the
    /// current row at the transaction time and inserts the new version.
    pub async fn persist_or_replace(
        &self,
        conn: &mut SqliteConnection,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Reconciliation> {
        let key = record.value_or_null(spec.key_column());
        let current = self.fetcher.fetch_current_with_meta(conn, key, spec).await?;
        let open_row = |record: &Record| {
            RecordWithMetadata::new(record.clone(), self.transaction_time(), None)
        };

        let Some(mut existing) = current else {
            let pid = self.insert_row(conn, &open_row(record), spec).await?;
            return Ok(Reconciliation::Inserted { pid });
        };

        let existing_pid = existing.pid.ok_or_else(|| PersistenceError::MissingPid {
            table: spec.table().to_string(),
        })?;
        if spec.same_persisted_values(&existing.record, record) {
            trace!(table = spec.table(), pid = existing_pid, "Row unchanged");
            return Ok(Reconciliation::Unchanged { pid: existing_pid });
        }

        existing.valid_to = Some(self.transaction_time());
        self.update(conn, &existing, spec).await?;
        let inserted = self.insert_row(conn, &open_row(record), spec).await?;

        Ok(Reconciliation::Replaced {
            terminated: existing_pid,
            inserted,
        })
    }
}
