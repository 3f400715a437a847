//! Badge renderer seam
//!
//! The renderer receives a validated attendee plus whatever QR bytes the
//! resolver produced. It is provenance-agnostic: deciding whether fallback
//! images are acceptable happens upstream.
//!
//! [`BundleRenderer`] writes the hand-off bundle consumed by the PDF
//! layout stage:
//!
//! ```text
//! {Apellido}_{Nombre}.json                  text fields for the front/back
//! {Apellido}_{Nombre}_qr.png                QR image
//! {Apellido}_{Nombre}_acompanante.json      companion (if any)
//! {Apellido}_{Nombre}_acompanante_qr.png
//! ```

use crate::attendee::AttendeeRecord;
use crate::stats::BadgeKind;
use crate::utils::{atomic_write, sanitize_file_stem};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Role printed on companion badges
pub const COMPANION_ROLE: &str = "Acompañante";

const COMPANION_SUFFIX: &str = "_acompanante";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Output directory {path} is not usable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode badge sheet: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Files produced for one person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBadge {
    pub kind: BadgeKind,
    pub files: Vec<PathBuf>,
}

pub trait BadgeRenderer {
    /// Check the environment once before any row (the output location must
    /// be writable, templates present, ...). Failure aborts the whole run.
    fn preflight(&self) -> Result<(), RenderError>;

    /// Produce the primary badge and, when the attendee has one, the
    /// companion badge
    fn render(
        &self,
        attendee: &AttendeeRecord,
        primary_qr: Option<&[u8]>,
        companion_qr: Option<&[u8]>,
    ) -> Result<Vec<RenderedBadge>, RenderError>;
}

/// Text content of one badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeSheet<'a> {
    pub kind: BadgeKind,
    pub row: usize,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: &'a str,
    pub office: &'a str,
    pub table: &'a str,
    pub tour: &'a str,
    pub qr_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BundleRenderer {
    output_dir: PathBuf,
}

impl BundleRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_person(
        &self,
        stem: &str,
        mut sheet: BadgeSheet<'_>,
        qr: Option<&[u8]>,
    ) -> Result<RenderedBadge, RenderError> {
        let mut files = Vec::with_capacity(2);

        if let Some(bytes) = qr {
            let qr_path = self.output_dir.join(format!("{}_qr.png", stem));
            write_file(&qr_path, bytes)?;
            sheet.qr_file = qr_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string());
            files.push(qr_path);
        }

        let sheet_path = self.output_dir.join(format!("{}.json", stem));
        let json = serde_json::to_vec_pretty(&sheet)?;
        write_file(&sheet_path, &json)?;
        files.insert(0, sheet_path);

        debug!(stem = %stem, kind = ?sheet.kind, "Badge bundle written");
        Ok(RenderedBadge {
            kind: sheet.kind,
            files,
        })
    }
}

impl BadgeRenderer for BundleRenderer {
    fn preflight(&self) -> Result<(), RenderError> {
        let dir_err = |source: std::io::Error| RenderError::OutputDir {
            path: self.output_dir.clone(),
            source,
        };

        std::fs::create_dir_all(&self.output_dir).map_err(dir_err)?;
        tempfile::NamedTempFile::new_in(&self.output_dir).map_err(dir_err)?;
        Ok(())
    }

    fn render(
        &self,
        attendee: &AttendeeRecord,
        primary_qr: Option<&[u8]>,
        companion_qr: Option<&[u8]>,
    ) -> Result<Vec<RenderedBadge>, RenderError> {
        let mut badges = Vec::with_capacity(2);

        let stem = person_stem(&attendee.last_name, &attendee.first_name);
        let primary = BadgeSheet {
            kind: BadgeKind::Primary,
            row: attendee.row_number,
            first_name: &attendee.first_name,
            last_name: &attendee.last_name,
            role: &attendee.position,
            office: &attendee.office,
            table: &attendee.table,
            tour: &attendee.tour,
            qr_file: None,
        };
        badges.push(self.write_person(&stem, primary, primary_qr)?);

        if let Some(companion) = &attendee.companion {
            let stem = format!(
                "{}{}",
                person_stem(&companion.last_name, &companion.first_name),
                COMPANION_SUFFIX
            );
            let sheet = BadgeSheet {
                kind: BadgeKind::Companion,
                row: attendee.row_number,
                first_name: &companion.first_name,
                last_name: &companion.last_name,
                role: COMPANION_ROLE,
                office: &attendee.office,
                table: &attendee.table,
                tour: &attendee.tour,
                qr_file: None,
            };
            badges.push(self.write_person(&stem, sheet, companion_qr)?);
        }

        Ok(badges)
    }
}

fn person_stem(last_name: &str, first_name: &str) -> String {
    format!(
        "{}_{}",
        sanitize_file_stem(last_name),
        sanitize_file_stem(first_name)
    )
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    atomic_write(path, bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}
