//! Test helpers for Stamdata core integration tests
//!
//! This module provides utilities for:
//! - In-memory SQLite pools
//! - Tracing setup
//! - Row counting assertions
//! - Test parsers and inboxes (see [`fixtures`])

#![allow(dead_code)]

pub mod fixtures;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use stamdata_core::clock::from_millis;
use std::path::Path;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Fixed starting instant for tests, on a whole millisecond
pub const T0_MILLIS: i64 = 1_700_000_000_000;

pub fn t0() -> DateTime<Utc> {
    from_millis(T0_MILLIS)
}

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stamdata_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Single-connection in-memory database
///
/// An in-memory SQLite database lives as long as its connection, so the pool
/// keeps exactly one and never recycles it. Tests must release any connection
/// they hold before code under test acquires one.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Number of rows in `table`
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Number of rows in `table` with no end of validity
pub async fn count_open_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE ValidTo IS NULL",
        table
    ))
    .fetch_one(pool)
    .await
    .expect("Failed to count open rows")
}

/// Create a data-set directory holding one file of lines
pub fn write_dataset(dir: &Path, file: &str, lines: &[String]) {
    std::fs::create_dir_all(dir).expect("Failed to create data set");
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(dir.join(file), content).expect("Failed to write data file");
}
