//! Record sources
//!
//! The batch runner only needs a header list and ordered raw rows. The
//! shipped source reads the JSON export of the attendee sheet: an array of
//! flat objects, one per row.

use crate::attendee::RawRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected record layout: {0}")]
    Layout(String),
}

/// Tabular input: header list plus rows keyed by header
pub trait RecordSource {
    /// Column names as they appear in the source
    fn headers(&self) -> &[String];

    /// Data rows in source order
    fn rows(&self) -> &[RawRecord];
}

/// Rows loaded from a JSON array of objects
#[derive(Debug, Clone, Default)]
pub struct JsonRecordSource {
    headers: Vec<String>,
    rows: Vec<RawRecord>,
}

impl JsonRecordSource {
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            rows = source.rows.len(),
            columns = source.headers.len(),
            "Attendee records loaded"
        );
        Ok(source)
    }

    /// Parse a JSON array of row objects
    ///
    /// Headers are the union of object keys in first-seen order. Scalars
    /// become text: `null` → empty, numbers in decimal form, booleans
    /// `TRUE`/`FALSE`. Nested arrays or objects are rejected.
    pub fn from_json_str(content: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Array(items) = value else {
            return Err(SourceError::Layout(
                "top level must be an array of row objects".to_string(),
            ));
        };

        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(fields) = item else {
                return Err(SourceError::Layout(format!("row {} is not an object", index)));
            };

            let mut row = RawRecord::new();
            for (field, value) in fields {
                let text = scalar_text(&value).ok_or_else(|| {
                    SourceError::Layout(format!(
                        "row {} field '{}' is not a scalar",
                        index, field
                    ))
                })?;
                if !headers.contains(&field) {
                    headers.push(field.clone());
                }
                row.insert(field, text);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }
}

impl RecordSource for JsonRecordSource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn rows(&self) -> &[RawRecord] {
        &self.rows
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
