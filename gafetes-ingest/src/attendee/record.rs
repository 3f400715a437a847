//! Raw and validated attendee rows

use serde::Serialize;
use std::collections::HashMap;

/// One untyped row from a record source: field name → scalar text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Field value trimmed, with absent fields read as empty
    pub fn text(&self, field: &str) -> String {
        self.get(field).map(str::trim).unwrap_or_default().to_string()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Companion travelling with an attendee
///
/// Only exists when the row declared a companion and all three companion
/// fields were present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Companion {
    pub first_name: String,
    pub last_name: String,
    pub qr: String,
}

/// A validated, immutable attendee row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendeeRecord {
    /// Human-facing spreadsheet row number (header is row 1)
    pub row_number: usize,
    pub position: String,
    pub first_name: String,
    pub last_name: String,
    pub office: String,
    pub tour: String,
    pub table: String,
    /// Own QR identifier, never empty
    pub qr: String,
    pub companion: Option<Companion>,
}

impl AttendeeRecord {
    pub fn has_companion(&self) -> bool {
        self.companion.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// QR identifiers in resolution order: primary, then companion
    pub fn qr_identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.qr.as_str())
            .chain(self.companion.as_ref().map(|c| c.qr.as_str()))
    }
}
