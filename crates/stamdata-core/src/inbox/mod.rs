//! Inbox of delivered data sets
//!
//! An inbox is an ordered, stability-gated queue of data-set directories.
//! A directory only becomes ready once its size has stopped changing, and
//! never ahead of a lexicographically earlier directory that is still
//! settling. A `LOCKED` file in the inbox root halts everything but
//! [`Inbox::lock`] and [`Inbox::is_locked`] until an operator removes it.

mod directory;

use std::path::PathBuf;
use thiserror::Error;

pub use directory::{
    DirectoryInbox, DEFAULT_SIZE_CACHE_EXPIRY, DEFAULT_STABILIZATION_PERIOD, LOCK_FILE_NAME,
};

pub type InboxResult<T> = Result<T, InboxError>;

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Inbox '{0}' is locked")]
    Locked(PathBuf),

    #[error("Inbox '{0}' has no ready data set to advance past")]
    NothingToAdvance(PathBuf),

    #[error("Could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not delete data set '{path}': {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create lock file '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InboxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Queue of data-set directories awaiting import
///
/// `update` must be called to refresh the ready queue before `top`.
pub trait Inbox: Send + Sync {
    /// Rescan the inbox and rebuild the ready queue
    fn update(&mut self) -> InboxResult<()>;

    /// The next ready data set, without removing it
    fn top(&self) -> InboxResult<Option<PathBuf>>;

    /// Delete the current top data set and drop it from the queue
    fn advance(&mut self) -> InboxResult<()>;

    /// Number of ready data sets
    fn ready_count(&self) -> InboxResult<usize>;

    /// Halt the inbox until the lock file is removed by hand
    fn lock(&self) -> InboxResult<()>;

    fn is_locked(&self) -> bool;
}
