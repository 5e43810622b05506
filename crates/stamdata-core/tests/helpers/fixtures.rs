//! Test fixtures for Stamdata core tests
//!
//! A small "person" register (CPR number plus name), a parser for it and an
//! inbox wrapper that records the order in which the scheduler calls it.

use async_trait::async_trait;
use sqlx::SqlitePool;
use stamdata_core::inbox::{DirectoryInbox, Inbox, InboxResult};
use stamdata_core::parser::{Parser, ParserError};
use stamdata_core::persistence::schema;
use stamdata_core::record::{decode_line, FieldSpecification, RecordSpecification};
use stamdata_core::scheduler::ImportRun;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const PERSON_TABLE: &str = "Person";
pub const PERSON_HOME: &str = "person";

// ============================================================================
// Person Register
// ============================================================================

/// `CPR` (10) + `Name` (20), keyed on CPR
pub fn person_spec() -> RecordSpecification {
    RecordSpecification::new(
        PERSON_TABLE,
        "CPR",
        vec![
            FieldSpecification::field("CPR", 10),
            FieldSpecification::field("Name", 20).as_optional(),
        ],
    )
    .expect("Invalid person specification")
}

/// One fixed-width person line
pub fn person_line(cpr: &str, name: &str) -> String {
    format!("{:<10}{:<20}", cpr, name)
}

/// Create the person table
pub async fn create_person_table(pool: &SqlitePool) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    schema::create_table(&mut conn, &person_spec())
        .await
        .expect("Failed to create person table");
}

// ============================================================================
// Call Recording
// ============================================================================

/// Shared, ordered log of named calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the last occurrence of `call`
    pub fn last(&self, call: &str) -> Option<usize> {
        self.calls().iter().rposition(|c| *c == call)
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Directory inbox that logs `update`, `top` and `advance`
pub struct RecordingInbox {
    inner: DirectoryInbox,
    log: CallLog,
}

impl RecordingInbox {
    pub fn new(inner: DirectoryInbox, log: CallLog) -> Self {
        Self { inner, log }
    }
}

impl Inbox for RecordingInbox {
    fn update(&mut self) -> InboxResult<()> {
        self.log.push("update");
        self.inner.update()
    }

    fn top(&self) -> InboxResult<Option<PathBuf>> {
        self.log.push("top");
        self.inner.top()
    }

    fn advance(&mut self) -> InboxResult<()> {
        self.log.push("advance");
        self.inner.advance()
    }

    fn ready_count(&self) -> InboxResult<usize> {
        self.inner.ready_count()
    }

    fn lock(&self) -> InboxResult<()> {
        self.inner.lock()
    }

    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

// ============================================================================
// Person Parser
// ============================================================================

/// How a [`PersonParser`] fails after writing its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Error,
    OutOfSequence,
}

/// Reads every file of a data set in name order and reconciles each line
pub struct PersonParser {
    spec: RecordSpecification,
    log: CallLog,
    failure: Option<Failure>,
}

impl PersonParser {
    pub fn new(log: CallLog) -> Self {
        Self {
            spec: person_spec(),
            log,
            failure: None,
        }
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }
}

#[async_trait]
impl Parser for PersonParser {
    fn home(&self) -> &str {
        PERSON_HOME
    }

    async fn process(&self, dataset: &Path, run: &mut ImportRun) -> Result<(), ParserError> {
        self.log.push("process");

        let mut files = std::fs::read_dir(dataset)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        files.sort();

        for file in files {
            let content = std::fs::read_to_string(&file)?;
            for line in content.lines() {
                let record = decode_line(line, &self.spec)?;
                run.persist_or_replace(&record, &self.spec).await?;
            }
        }

        match self.failure {
            None => Ok(()),
            Some(Failure::Error) => Err(anyhow::anyhow!("person register is corrupt").into()),
            Some(Failure::OutOfSequence) => Err(ParserError::out_of_sequence(
                dataset,
                "expected an earlier delivery first",
            )),
        }
    }
}
