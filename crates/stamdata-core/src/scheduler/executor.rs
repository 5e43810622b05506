use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::run::ImportRun;
use super::{RunError, RunResult};
use crate::clock::{to_millis, truncate_to_millis, Clock};
use crate::inbox::Inbox;
use crate::parser::Parser;
use crate::status::ImportStatusRepository;

/// What a single run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The inbox is locked; nothing was attempted
    Locked,
    /// No data set was ready
    Idle,
    /// A data set was imported, committed and removed from the inbox
    Imported { run_id: String, dataset: PathBuf },
}

/// Runs one parser against one inbox, one data set per run
///
/// This is the error boundary of an import: any failure rolls back the
/// run's transaction, locks the inbox and records a failed attempt.
pub struct ParserExecutor {
    parser: Arc<dyn Parser>,
    inbox: Box<dyn Inbox>,
    status: Arc<dyn ImportStatusRepository>,
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ParserExecutor {
    pub fn new(
        parser: Arc<dyn Parser>,
        inbox: Box<dyn Inbox>,
        status: Arc<dyn ImportStatusRepository>,
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            parser,
            inbox,
            status,
            pool,
            clock,
        }
    }

    pub fn home(&self) -> &str {
        self.parser.home()
    }

    pub fn inbox(&self) -> &dyn Inbox {
        self.inbox.as_ref()
    }

    /// Import the next ready data set, if any
    pub async fn run(&mut self) -> RunResult<RunOutcome> {
        let home = self.parser.home().to_string();

        if self.inbox.is_locked() {
            debug!(parser = %home, "Inbox is locked, skipping run");
            return Ok(RunOutcome::Locked);
        }

        let dataset = match self.next_dataset() {
            Ok(Some(dataset)) => dataset,
            Ok(None) => {
                debug!(parser = %home, "No data set ready");
                return Ok(RunOutcome::Idle);
            }
            Err(err) => {
                self.fail(&err, false).await;
                return Err(err);
            }
        };

        let transaction_time = truncate_to_millis(self.clock.now());
        let run_id = format!("{}-{}", home, to_millis(transaction_time));
        log_dataset(&dataset);

        let mut started = false;
        match self
            .import(&dataset, &run_id, transaction_time, &mut started)
            .await
        {
            Ok(()) => {
                info!(parser = %home, run_id = %run_id, dataset = %dataset.display(), "Import completed");
                Ok(RunOutcome::Imported { run_id, dataset })
            }
            Err(err) => {
                self.fail(&err, started).await;
                Err(err)
            }
        }
    }

    fn next_dataset(&mut self) -> RunResult<Option<PathBuf>> {
        self.inbox.update()?;
        Ok(self.inbox.top()?)
    }

    async fn import(
        &mut self,
        dataset: &Path,
        run_id: &str,
        transaction_time: chrono::DateTime<chrono::Utc>,
        started: &mut bool,
    ) -> RunResult<()> {
        // Outside the run transaction so the attempt survives a rollback
        {
            let mut conn = self.pool.acquire().await?;
            self.status
                .import_started_at(&mut conn, transaction_time)
                .await?;
        }
        *started = true;

        let mut run = ImportRun::begin(&self.pool, run_id, transaction_time).await?;

        match self.process_and_advance(dataset, &mut run).await {
            Ok(()) => {
                run.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = run.rollback().await {
                    warn!(run_id = %run_id, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn process_and_advance(&mut self, dataset: &Path, run: &mut ImportRun) -> RunResult<()> {
        self.parser.process(dataset, run).await?;
        self.inbox.advance()?;
        self.status
            .import_ended_with_success(run.conn(), self.clock.now())
            .await?;
        Ok(())
    }

    /// Lock the inbox and record the failure; neither may hide `err`
    async fn fail(&mut self, err: &RunError, started: bool) {
        if let Err(lock_err) = self.inbox.lock() {
            error!(error = %lock_err, "Could not lock inbox after failed run");
        }

        if started {
            let recorded = match self.pool.acquire().await {
                Ok(mut conn) => self
                    .status
                    .import_ended_with_failure(&mut conn, self.clock.now())
                    .await
                    .map_err(RunError::from),
                Err(e) => Err(RunError::from(e)),
            };
            if let Err(status_err) = recorded {
                error!(error = %status_err, "Could not record failed import");
            }
        }

        error!(parser = %self.parser.home(), error = %err, "Import run failed, inbox locked");
    }
}

/// Log the data set and every file in it with its MD5
fn log_dataset(dataset: &Path) {
    info!(dataset = %dataset.display(), "Importing data set");

    let files = WalkDir::new(dataset)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    for entry in files {
        match stamdata_common::checksum::compute_file_md5(entry.path()) {
            Ok(md5) => info!(file = %entry.path().display(), md5 = %md5, "Data set file"),
            Err(e) => warn!(file = %entry.path().display(), error = %e, "Could not checksum file"),
        }
    }
}
