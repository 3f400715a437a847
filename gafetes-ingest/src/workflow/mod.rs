//! Batch workflow: record source → validation → QR pipeline → renderer

pub mod renderer;
pub mod runner;
pub mod source;

pub use renderer::{BadgeRenderer, BundleRenderer, RenderError, RenderedBadge};
pub use runner::{BatchRunner, RunOptions, RunReport};
pub use source::{JsonRecordSource, RecordSource, SourceError};
