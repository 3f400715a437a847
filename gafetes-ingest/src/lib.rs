//! # gafetes ingest
//!
//! Attendee validation and QR acquisition for event badge generation.
//!
//! **Pipeline:**
//! - `attendee`: required-column gate and per-row validation
//! - `qr`: identifier classification, two-tier cache, remote source with
//!   retry, local fallback generation, parallel prefetch
//! - `stats`: run counters and summary
//! - `workflow`: record source, renderer seam and the batch runner
//!
//! Every resolved QR image carries a [`qr::QrProvenance`]; locally generated
//! images are never stored or counted as event-valid.

pub mod attendee;
pub mod error;
pub mod qr;
pub mod stats;
pub mod utils;
pub mod workflow;

pub use error::{QrError, WorkflowError};
