//! Stamdata Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the Stamdata import workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Common error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//! - **Checksums**: MD5 digests used when logging delivered data sets
//!
//! # Example
//!
//! ```no_run
//! use stamdata_common::checksum::compute_file_md5;
//! use stamdata_common::Result;
//!
//! fn describe(path: &str) -> Result<()> {
//!     let md5 = compute_file_md5(path)?;
//!     tracing::info!(file = path, md5 = %md5, "Delivered file");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
