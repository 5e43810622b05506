//! Bitemporal persistence engine
//!
//! Every register table carries, next to its persisted fields, an
//! auto-incrementing `PID` and three timestamps:
//!
//! - `ValidFrom` / `ValidTo`: the interval in which the row version is the
//!   truth about its key (`ValidTo` NULL means open-ended)
//! - `ModifiedDate`: when the row version was last written
//!
//! Writes never edit history in place. Corrections close the current
//! version and open a new one, and at most one version per key is valid at
//! any instant.
//!
//! A [`RecordPersister`] and its [`RecordFetcher`] are created per import run
//! with the run's pinned transaction time, so every row written in the run
//! shares the same `ModifiedDate` and lookups agree on what "now" is.
//!
//! All operations take a `&mut SqliteConnection`, normally the run's open
//! transaction.

mod error;
mod fetcher;
mod persister;
pub mod schema;
mod statements;

pub use error::{PersistenceError, PersistenceResult};
pub use fetcher::RecordFetcher;
pub use persister::{Reconciliation, RecordPersister};
pub use statements::{MODIFIED_DATE, PID, VALID_FROM, VALID_TO};
