//! Import scheduler
//!
//! Runs a [`ParserExecutor`] on a fixed delay. Runs never overlap: the next
//! one is scheduled only after the previous one has finished. A failed run
//! locks its inbox, so later runs no-op until an operator intervenes.

mod executor;
mod run;

use anyhow::Context;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use executor::{ParserExecutor, RunOutcome};
pub use run::ImportRun;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::inbox::{DirectoryInbox, InboxError};
use crate::parser::{Parser, ParserError};
use crate::status::{SqliteImportStatusRepository, StatusError};

pub type RunResult<T> = Result<T, RunError>;

/// Why an import run failed
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Inbox error: {0}")]
    Inbox(#[from] InboxError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fixed-delay loop around one executor
pub struct ImportScheduler {
    executor: ParserExecutor,
    delay: Duration,
}

impl ImportScheduler {
    pub fn new(executor: ParserExecutor, delay: Duration) -> Self {
        Self { executor, delay }
    }

    /// Wire a directory inbox and a status table for `parser` from configuration
    pub async fn from_config(
        config: &Config,
        pool: SqlitePool,
        parser: Arc<dyn Parser>,
    ) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let home = parser.home().to_string();

        let inbox = DirectoryInbox::open(&config.inbox.root, &home, clock.clone())
            .with_context(|| format!("Failed to open inbox for '{}'", home))?
            .with_stabilization_period(Duration::from_secs(config.inbox.stabilization_secs))
            .with_size_cache_expiry(Duration::from_secs(config.inbox.size_cache_expiry_secs));

        let status = SqliteImportStatusRepository::new(
            pool.clone(),
            &home,
            clock.clone(),
            config.scheduler.max_days_between_runs,
        )?;
        status
            .ensure_table()
            .await
            .context("Failed to create import status table")?;

        info!(parser = %home, inbox = %inbox, "Import scheduler configured");

        let executor = ParserExecutor::new(parser, Box::new(inbox), Arc::new(status), pool, clock);
        Ok(Self::new(
            executor,
            Duration::from_millis(config.scheduler.run_delay_ms),
        ))
    }

    pub fn executor(&self) -> &ParserExecutor {
        &self.executor
    }

    /// A single run, outside the loop
    pub async fn run_once(&mut self) -> RunResult<RunOutcome> {
        self.executor.run().await
    }

    /// Run until `shutdown` resolves; shutdown is only observed between runs
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(parser = %self.executor.home(), delay_ms = self.delay.as_millis() as u64, "Import scheduler started");

        loop {
            match self.executor.run().await {
                Ok(outcome) => debug!(?outcome, "Run finished"),
                // already reported by the executor
                Err(_) => debug!("Run failed"),
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        info!(parser = %self.executor.home(), "Import scheduler stopped");
    }

    /// Spawn the loop on the tokio runtime
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run_until(std::future::pending()))
    }
}
