//! Required-column gate
//!
//! Runs once against the source header before any row is touched. Header
//! names are trimmed and matched case-insensitively; every missing column
//! is reported in a single error.

use super::record::RawRecord;
use std::collections::HashMap;
use thiserror::Error;

pub const POSITION: &str = "Puesto";
pub const FIRST_NAME: &str = "PrimerNombre";
pub const LAST_NAME: &str = "PrimerApellido";
pub const OFFICE: &str = "Oficina";
pub const TOUR: &str = "Tour";
pub const TABLE: &str = "Mesa";
pub const HAS_COMPANION: &str = "LLevaConyugue";
pub const COMPANION_FIRST_NAME: &str = "PrimerNombreConyugue";
pub const COMPANION_LAST_NAME: &str = "PrimerApellidoConyugue";
pub const QR: &str = "QR";
pub const COMPANION_QR: &str = "QR_Conyugue";

/// Columns every record source must provide, in reporting order
pub const REQUIRED_COLUMNS: [&str; 11] = [
    POSITION,
    FIRST_NAME,
    LAST_NAME,
    OFFICE,
    TOUR,
    TABLE,
    HAS_COMPANION,
    COMPANION_FIRST_NAME,
    COMPANION_LAST_NAME,
    QR,
    COMPANION_QR,
];

/// One or more required columns are absent from the header
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Missing required columns: {}. Columns found: {}",
    .missing.join(", "),
    .found.join(", ")
)]
pub struct MissingColumns {
    /// Canonical names of the absent columns
    pub missing: Vec<String>,
    /// Header exactly as the source reported it
    pub found: Vec<String>,
}

/// Mapping from canonical column name to the header the source actually uses
#[derive(Debug, Clone)]
pub struct ColumnMap {
    actual: HashMap<&'static str, String>,
}

impl ColumnMap {
    /// Match the required columns against a source header
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, MissingColumns> {
        let mut actual = HashMap::new();
        let mut missing = Vec::new();

        for required in REQUIRED_COLUMNS {
            let found = headers
                .iter()
                .map(AsRef::as_ref)
                .find(|h| h.trim().eq_ignore_ascii_case(required));

            match found {
                Some(header) => {
                    actual.insert(required, header.to_string());
                }
                None => missing.push(required.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(MissingColumns {
                missing,
                found: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            });
        }

        Ok(Self { actual })
    }

    /// Header used by the source for a canonical column
    pub fn header_for(&self, canonical: &str) -> Option<&str> {
        self.actual.get(canonical).map(String::as_str)
    }

    /// Re-key a raw row by canonical column names
    ///
    /// Columns outside the required set are dropped.
    pub fn canonicalize(&self, raw: &RawRecord) -> RawRecord {
        let mut record = RawRecord::new();
        for (canonical, header) in &self.actual {
            if let Some(value) = raw.get(header) {
                record.insert(*canonical, value);
            }
        }
        record
    }
}
