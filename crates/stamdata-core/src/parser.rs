//! Parser contract
//!
//! A parser knows how to turn one delivered data set into rows. It is handed
//! the data-set directory and an [`ImportRun`] holding the run's open
//! transaction and persister; the scheduler commits or rolls back around it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::record::RecordError;
use crate::scheduler::ImportRun;

#[derive(Error, Debug)]
pub enum ParserError {
    /// The data set arrived out of its expected order
    #[error("Data set '{}' is out of sequence: {reason}", dataset.display())]
    OutOfSequence { dataset: PathBuf, reason: String },

    #[error("Invalid record: {0}")]
    Record(#[from] RecordError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParserError {
    pub fn out_of_sequence(dataset: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OutOfSequence {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    pub fn is_out_of_sequence(&self) -> bool {
        matches!(self, Self::OutOfSequence { .. })
    }
}

/// Imports one kind of register
#[async_trait]
pub trait Parser: Send + Sync {
    /// Inbox subdirectory and status table prefix; must be a plain identifier
    fn home(&self) -> &str;

    /// Import every file of `dataset` through `run`
    async fn process(&self, dataset: &Path, run: &mut ImportRun) -> Result<(), ParserError>;
}
