//! Stamdata Core Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch import core for master-data registers.
//!
//! # Overview
//!
//! Registers are delivered as directories of fixed-width files. The core
//! turns each delivery into bitemporal history:
//!
//! - **Record Model**: typed field and record specifications, fixed-width
//!   line decoding
//! - **Persistence**: insert / terminate / update / as-of fetch over tables
//!   carrying `ValidFrom`, `ValidTo` and `ModifiedDate`, plus the
//!   persist-or-replace reconciliation for full snapshots
//! - **Inbox**: stability-gated, ordered queue of delivered directories with
//!   a `LOCKED` sentinel for manual intervention
//! - **Scheduler**: one transactional run at a time, one pinned transaction
//!   time per run, fail-lock on any error
//! - **Status**: per-parser history of import attempts
//!
//! # Architecture
//!
//! ```text
//! ImportScheduler ──► ParserExecutor ──► Inbox.update() / top()
//!                          │
//!                          ├──► Parser.process(dataset, &mut ImportRun)
//!                          │         └──► RecordPersister (run transaction)
//!                          └──► Inbox.advance() ──► commit
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stamdata_common::logging::{init_logging, LogConfig};
//! use stamdata_core::{config::Config, db, parser::Parser, scheduler::ImportScheduler};
//!
//! async fn serve(parser: Arc<dyn Parser>) -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     let scheduler = ImportScheduler::from_config(&config, pool, parser).await?;
//!     scheduler.start().await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod db;
pub mod inbox;
pub mod parser;
pub mod persistence;
pub mod record;
pub mod scheduler;
pub mod status;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use inbox::{DirectoryInbox, Inbox, InboxError};
pub use parser::{Parser, ParserError};
pub use persistence::{PersistenceError, Reconciliation, RecordFetcher, RecordPersister};
pub use record::{
    decode_line, FieldSpecification, FieldValue, Record, RecordBuilder, RecordSpecification,
    RecordWithMetadata,
};
pub use scheduler::{ImportRun, ImportScheduler, ParserExecutor, RunError, RunOutcome};
pub use status::{ImportStatus, ImportStatusRepository, Outcome, SqliteImportStatusRepository};
