//! Import status history
//!
//! One row per import attempt: when it started, when it ended and how. Idle
//! polls of an empty inbox never produce a row.

mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::fmt;
use thiserror::Error;

pub use sqlite::SqliteImportStatusRepository;

pub type StatusResult<T> = Result<T, StatusError>;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Status query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("'{0}' cannot be used as a status table prefix")]
    InvalidHome(String),

    #[error("Unknown import outcome '{0}'")]
    InvalidOutcome(String),
}

/// How an import attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Ok(Outcome::Success),
            "FAILURE" => Ok(Outcome::Failure),
            _ => Err(StatusError::InvalidOutcome(s.to_string())),
        }
    }
}

/// The latest recorded import attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Last import started at {}", self.start_time.to_rfc3339())?;

        match self.end_time {
            Some(end) => write!(
                f,
                " and ended at {}. Processing took {} seconds",
                end.to_rfc3339(),
                (end - self.start_time).num_seconds()
            )?,
            None => write!(f, " and is still running")?,
        }

        if let Some(outcome) = self.outcome {
            write!(f, ". Outcome was {}", outcome)?;
        }

        Ok(())
    }
}

/// Where import attempts are recorded
///
/// Writes take an explicit connection so the caller decides whether they
/// join the run's transaction or survive its rollback.
#[async_trait]
pub trait ImportStatusRepository: Send + Sync {
    async fn import_started_at(
        &self,
        conn: &mut SqliteConnection,
        start: DateTime<Utc>,
    ) -> StatusResult<()>;

    /// Mark the newest attempt successful; no-op when nothing was started
    async fn import_ended_with_success(
        &self,
        conn: &mut SqliteConnection,
        end: DateTime<Utc>,
    ) -> StatusResult<()>;

    /// Mark the newest attempt failed; no-op when nothing was started
    async fn import_ended_with_failure(
        &self,
        conn: &mut SqliteConnection,
        end: DateTime<Utc>,
    ) -> StatusResult<()>;

    async fn latest_status(&self) -> StatusResult<Option<ImportStatus>>;

    /// True when the last attempt started longer ago than allowed; never true before the first run
    async fn is_overdue(&self) -> StatusResult<bool>;

    async fn is_db_alive(&self) -> bool;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clock::from_millis;

    #[test]
    fn test_outcome_round_trips_through_text() {
        assert_eq!("SUCCESS".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!("failure".parse::<Outcome>().unwrap(), Outcome::Failure);
        assert!("DONE".parse::<Outcome>().is_err());
        assert_eq!(Outcome::Failure.to_string(), "FAILURE");
    }

    #[test]
    fn test_display_finished_import() {
        let status = ImportStatus {
            start_time: from_millis(0),
            end_time: Some(from_millis(75_000)),
            outcome: Some(Outcome::Success),
        };

        assert_eq!(
            status.to_string(),
            "Last import started at 1970-01-01T00:00:00+00:00 and ended at \
             1970-01-01T00:01:15+00:00. Processing took 75 seconds. Outcome was SUCCESS"
        );
    }

    #[test]
    fn test_display_running_import() {
        let status = ImportStatus {
            start_time: from_millis(0),
            end_time: None,
            outcome: None,
        };

        assert!(status.to_string().ends_with("and is still running"));
    }
}
