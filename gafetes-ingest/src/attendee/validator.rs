//! Attendee row validation
//!
//! Pure functions over a canonicalised row. A rejected row yields a single
//! message listing every violated rule; the caller collects rejections and
//! keeps going.

use super::columns::{
    COMPANION_FIRST_NAME, COMPANION_LAST_NAME, COMPANION_QR, FIRST_NAME, HAS_COMPANION,
    LAST_NAME, OFFICE, POSITION, QR, TABLE, TOUR,
};
use super::record::{AttendeeRecord, Companion, RawRecord};
use thiserror::Error;
use tracing::{info, warn};

/// Tokens read as "yes" in the companion column, compared upper-cased
pub const AFFIRMATIVE_TOKENS: [&str; 8] = ["SI", "SÍ", "S", "YES", "Y", "1", "TRUE", "VERDADERO"];

/// Offset from a zero-based data row index to the spreadsheet row number
/// (one for the header, one for 1-based numbering)
pub const HEADER_ROW_OFFSET: usize = 2;

/// How many rejections are echoed to the log after a batch
const LOGGED_REJECTIONS: usize = 5;

/// A row failed required or conditional field checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Fila {row_number}: {}", .reasons.join("; "))]
pub struct Rejection {
    /// Human-facing row number
    pub row_number: usize,
    /// Every violated rule, in check order
    pub reasons: Vec<String>,
}

/// Parse the has-companion cell
///
/// Only the fixed token set is truthy; blanks and anything else are false.
pub fn parse_affirmative(value: &str) -> bool {
    let token = value.trim().to_uppercase();
    AFFIRMATIVE_TOKENS.contains(&token.as_str())
}

/// Validate one canonicalised row
pub fn validate(raw: &RawRecord, row_index: usize) -> Result<AttendeeRecord, Rejection> {
    let first_name = raw.text(FIRST_NAME);
    let last_name = raw.text(LAST_NAME);
    let qr = raw.text(QR);
    let has_companion = raw.get(HAS_COMPANION).map(parse_affirmative).unwrap_or(false);

    let mut reasons = Vec::new();

    for (field, value) in [(FIRST_NAME, &first_name), (LAST_NAME, &last_name), (QR, &qr)] {
        if value.is_empty() {
            reasons.push(format!("{} vacío", field));
        }
    }

    let companion = if has_companion {
        let companion = Companion {
            first_name: raw.text(COMPANION_FIRST_NAME),
            last_name: raw.text(COMPANION_LAST_NAME),
            qr: raw.text(COMPANION_QR),
        };
        for (field, value) in [
            (COMPANION_FIRST_NAME, &companion.first_name),
            (COMPANION_LAST_NAME, &companion.last_name),
            (COMPANION_QR, &companion.qr),
        ] {
            if value.is_empty() {
                reasons.push(format!("{}=True pero {} vacío", HAS_COMPANION, field));
            }
        }
        Some(companion)
    } else {
        None
    };

    let row_number = row_index + HEADER_ROW_OFFSET;

    if !reasons.is_empty() {
        return Err(Rejection { row_number, reasons });
    }

    Ok(AttendeeRecord {
        row_number,
        position: raw.text(POSITION),
        first_name,
        last_name,
        office: raw.text(OFFICE),
        tour: raw.text(TOUR),
        table: raw.text(TABLE),
        qr,
        companion,
    })
}

/// Outcome of validating every row of a source
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub attendees: Vec<AttendeeRecord>,
    pub rejections: Vec<Rejection>,
}

impl ValidationReport {
    pub fn total_rows(&self) -> usize {
        self.attendees.len() + self.rejections.len()
    }

    pub fn with_companion(&self) -> usize {
        self.attendees.iter().filter(|a| a.has_companion()).count()
    }
}

/// Validate a batch of canonicalised rows, never aborting on a bad row
pub fn validate_all<'a, I>(rows: I) -> ValidationReport
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut report = ValidationReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        match validate(row, index) {
            Ok(attendee) => report.attendees.push(attendee),
            Err(rejection) => {
                warn!("{}", rejection);
                report.rejections.push(rejection);
            }
        }
    }

    info!(
        total = report.total_rows(),
        valid = report.attendees.len(),
        rejected = report.rejections.len(),
        "Row validation complete"
    );

    if !report.rejections.is_empty() {
        warn!("Rows skipped by validation:");
        for rejection in report.rejections.iter().take(LOGGED_REJECTIONS) {
            warn!("  - {}", rejection);
        }
        if report.rejections.len() > LOGGED_REJECTIONS {
            warn!(
                "  ... and {} more",
                report.rejections.len() - LOGGED_REJECTIONS
            );
        }
    }

    report
}
