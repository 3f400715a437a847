//! Run statistics
//!
//! Counters are bumped by the batch runner as rows flow through. The QR
//! tally is driven by the provenance each resolution returned, never by
//! looking at the cache directory afterwards.

use crate::qr::QrProvenance;
use crate::utils::atomic_write;
use chrono::{DateTime, Utc};
use gafetes_common::time;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Error lines shown in a summary before "... and N more"
pub const SUMMARY_ERROR_LINES: usize = 5;

/// Characters kept per error line in a summary
pub const SUMMARY_ERROR_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    Primary,
    Companion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub primary_badges: usize,
    pub companion_badges: usize,
    /// Fresh from the event server
    pub qr_downloaded: usize,
    /// Valid-tier cache hits
    pub qr_from_cache: usize,
    /// Generated now or reused from the fallback tier; not scannable
    pub qr_generated_locally: usize,
    pub qr_local_files: usize,
    /// Full error log; only the summary truncates
    pub errors: Vec<ErrorEntry>,
    pub started_at: DateTime<Utc>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::started_at(time::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            rows_processed: 0,
            rows_skipped: 0,
            primary_badges: 0,
            companion_badges: 0,
            qr_downloaded: 0,
            qr_from_cache: 0,
            qr_generated_locally: 0,
            qr_local_files: 0,
            errors: Vec::new(),
            started_at,
        }
    }

    pub fn record_processed(&mut self) {
        self.rows_processed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.rows_skipped += 1;
    }

    pub fn record_badge(&mut self, kind: BadgeKind) {
        match kind {
            BadgeKind::Primary => self.primary_badges += 1,
            BadgeKind::Companion => self.companion_badges += 1,
        }
    }

    pub fn record_qr(&mut self, provenance: QrProvenance) {
        match provenance {
            QrProvenance::Downloaded => self.qr_downloaded += 1,
            QrProvenance::CacheValid => self.qr_from_cache += 1,
            QrProvenance::CacheFallback | QrProvenance::GeneratedFallback => {
                self.qr_generated_locally += 1
            }
            QrProvenance::LocalFile => self.qr_local_files += 1,
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(ErrorEntry {
            at: time::now(),
            message: message.into(),
        });
    }

    pub fn total_badges(&self) -> usize {
        self.primary_badges + self.companion_badges
    }

    /// Share of processed rows that were not skipped, in percent
    pub fn success_rate(&self) -> Option<f64> {
        if self.rows_processed == 0 {
            return None;
        }
        let succeeded = self.rows_processed.saturating_sub(self.rows_skipped);
        Some(succeeded as f64 / self.rows_processed as f64 * 100.0)
    }

    pub fn summary(&self) -> String {
        self.summary_at(time::now())
    }

    /// Render the summary as of `finished_at`
    pub fn summary_at(&self, finished_at: DateTime<Utc>) -> String {
        let elapsed = (finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        let mut lines = vec![
            "=".repeat(60),
            "RUN SUMMARY".to_string(),
            "=".repeat(60),
            format!("Started: {}", time::display_stamp(self.started_at)),
            format!("Elapsed: {:.1}s", elapsed),
            format!("Rows processed: {}", self.rows_processed),
            format!("Rows skipped: {}", self.rows_skipped),
            format!(
                "Badges generated: {} (primary {}, companion {})",
                self.total_badges(),
                self.primary_badges,
                self.companion_badges
            ),
            "QR codes:".to_string(),
            format!("   Downloaded: {}", self.qr_downloaded),
            format!("   From cache: {}", self.qr_from_cache),
            format!(
                "   Generated locally (NOT valid for scanning): {}",
                self.qr_generated_locally
            ),
            format!("   Local files: {}", self.qr_local_files),
        ];

        match self.success_rate() {
            Some(rate) => lines.push(format!("Success rate: {:.1}%", rate)),
            None => lines.push("Success rate: n/a".to_string()),
        }

        if !self.errors.is_empty() {
            lines.push(format!("Errors ({}):", self.errors.len()));
            for entry in self.errors.iter().take(SUMMARY_ERROR_LINES) {
                let short: String = entry.message.chars().take(SUMMARY_ERROR_WIDTH).collect();
                lines.push(format!("   - {}", short));
            }
            if self.errors.len() > SUMMARY_ERROR_LINES {
                lines.push(format!(
                    "   ... and {} more",
                    self.errors.len() - SUMMARY_ERROR_LINES
                ));
            }
        }

        lines.push("=".repeat(60));
        lines.join("\n")
    }

    /// Write the summary next to `base`, suffixed with a timestamp
    ///
    /// `out/resumen.txt` becomes `out/resumen_20251018_142501.txt`.
    pub fn persist(&self, base: &Path) -> std::io::Result<PathBuf> {
        let path = stamped_path(base, &time::file_stamp(time::now()));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        atomic_write(&path, self.summary().as_bytes())?;
        info!(path = %path.display(), "Run summary saved");
        Ok(path)
    }
}

fn stamped_path(base: &Path, stamp: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "resumen".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    base.with_file_name(name)
}
