//! Error types for QR resolution and batch runs

use crate::attendee::MissingColumns;
use crate::workflow::renderer::RenderError;
use crate::workflow::source::SourceError;
use thiserror::Error;

/// Terminal QR resolution failures
///
/// Every other irregularity (cache miss, unreadable local file, cache write
/// failure) degrades to a provenance-tagged success instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrError {
    /// Download exhausted its attempts and fallback is disallowed
    #[error("QR server unreachable for '{key}' after {attempts} attempt(s): {url}")]
    ServerUnreachable {
        key: String,
        url: String,
        attempts: u32,
    },

    /// Local synthesis failed (payload too large for any QR version)
    #[error("Local QR generation failed for '{0}': {1}")]
    Generation(String, String),
}

impl QrError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, QrError::ServerUnreachable { .. })
    }
}

/// Structural failures that abort a run before any row is processed
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    MissingColumns(#[from] MissingColumns),

    #[error("Too many attendees: {count} (limit {limit})")]
    TooManyAttendees { count: usize, limit: usize },

    #[error("Environment check failed: {0}")]
    Preflight(#[from] RenderError),

    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Common(#[from] gafetes_common::Error),
}
