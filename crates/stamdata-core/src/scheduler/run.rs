use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::persistence::{PersistenceResult, Reconciliation, RecordFetcher, RecordPersister};
use crate::record::{FieldValue, Record, RecordSpecification, RecordWithMetadata};

/// Context of one import attempt
///
/// Owns the run's database transaction and a persister pinned to the run's
/// transaction time. Everything a parser writes through it commits or rolls
/// back together.
pub struct ImportRun {
    run_id: String,
    tx: Transaction<'static, Sqlite>,
    persister: RecordPersister,
}

impl ImportRun {
    /// Open a transaction on `pool` for a new run
    pub async fn begin(
        pool: &SqlitePool,
        run_id: impl Into<String>,
        transaction_time: DateTime<Utc>,
    ) -> sqlx::Result<Self> {
        Ok(Self {
            run_id: run_id.into(),
            tx: pool.begin().await?,
            persister: RecordPersister::new(transaction_time),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn transaction_time(&self) -> DateTime<Utc> {
        self.persister.transaction_time()
    }

    pub fn persister(&self) -> &RecordPersister {
        &self.persister
    }

    pub fn fetcher(&self) -> &RecordFetcher {
        self.persister.fetcher()
    }

    /// The open transaction, for parser-specific statements
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn insert(
        &mut self,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        self.persister.insert(&mut self.tx, record, spec).await
    }

    pub async fn insert_with_meta(
        &mut self,
        row: &RecordWithMetadata,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        self.persister.insert_with_meta(&mut self.tx, row, spec).await
    }

    pub async fn terminate(
        &mut self,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<u64> {
        self.persister.terminate(&mut self.tx, record, spec).await
    }

    pub async fn terminate_at(
        &mut self,
        record: &Record,
        spec: &RecordSpecification,
        when: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        self.persister
            .terminate_at(&mut self.tx, record, spec, when)
            .await
    }

    pub async fn update(
        &mut self,
        row: &RecordWithMetadata,
        spec: &RecordSpecification,
    ) -> PersistenceResult<RecordWithMetadata> {
        self.persister.update(&mut self.tx, row, spec).await
    }

    pub async fn persist_or_replace(
        &mut self,
        record: &Record,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Reconciliation> {
        self.persister
            .persist_or_replace(&mut self.tx, record, spec)
            .await
    }

    pub async fn fetch_current(
        &mut self,
        key: &FieldValue,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<Record>> {
        self.persister
            .fetcher()
            .fetch_current(&mut self.tx, key, spec)
            .await
    }

    pub async fn fetch_current_with_meta(
        &mut self,
        key: &FieldValue,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<RecordWithMetadata>> {
        self.persister
            .fetcher()
            .fetch_current_with_meta(&mut self.tx, key, spec)
            .await
    }

    pub async fn fetch_with_meta_at(
        &mut self,
        key: &FieldValue,
        as_of: DateTime<Utc>,
        spec: &RecordSpecification,
    ) -> PersistenceResult<Option<RecordWithMetadata>> {
        self.persister
            .fetcher()
            .fetch_with_meta_at(&mut self.tx, key, as_of, spec)
            .await
    }

    pub async fn commit(self) -> sqlx::Result<()> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> sqlx::Result<()> {
        self.tx.rollback().await
    }
}

impl std::fmt::Debug for ImportRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportRun")
            .field("run_id", &self.run_id)
            .field("transaction_time", &self.transaction_time())
            .finish_non_exhaustive()
    }
}
