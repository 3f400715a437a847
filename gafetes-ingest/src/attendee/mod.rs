//! Attendee ingestion: column gate, raw rows, validation

pub mod columns;
pub mod record;
pub mod validator;

pub use columns::{ColumnMap, MissingColumns, REQUIRED_COLUMNS};
pub use record::{AttendeeRecord, Companion, RawRecord};
pub use validator::{parse_affirmative, validate, validate_all, Rejection, ValidationReport};
