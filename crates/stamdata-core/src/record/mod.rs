//! Record model
//!
//! Registers are described in code by a [`RecordSpecification`]: a table
//! name, a natural key column and an ordered list of fixed-width
//! [`FieldSpecification`]s. Input lines are decoded with [`decode_line`] into
//! an immutable [`Record`]; records headed for the database are wrapped in a
//! [`RecordWithMetadata`] carrying the bitemporal columns.
//!
//! # Example
//!
//! ```
//! use stamdata_core::record::{decode_line, FieldSpecification, FieldValue, RecordSpecification};
//!
//! let spec = RecordSpecification::new(
//!     "Postnummer",
//!     "Nummer",
//!     vec![
//!         FieldSpecification::field("Nummer", 4).as_integer(),
//!         FieldSpecification::field("Navn", 20),
//!     ],
//! )?;
//!
//! let record = decode_line("8000Aarhus C            ", &spec)?;
//! assert_eq!(record.get("Nummer"), Some(&FieldValue::Integer(8000)));
//! assert_eq!(record.get("Navn"), Some(&FieldValue::from("Aarhus C")));
//! # Ok::<(), stamdata_core::record::RecordError>(())
//! ```

mod builder;
mod error;
mod field;
mod line;
mod spec;
mod value;

pub use builder::{Record, RecordBuilder, RecordWithMetadata};
pub use error::{RecordError, RecordResult};
pub use field::{FieldSpecification, FieldType};
pub use line::decode_line;
pub use spec::RecordSpecification;
pub use value::{Decimal, FieldValue};

pub(crate) use spec::is_identifier;
