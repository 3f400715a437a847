//! Batch runner
//!
//! Order of a run:
//! 1. Column gate on the source header (structural)
//! 2. Validate every row; rejections are recorded, not fatal
//! 3. Attendee limit (structural)
//! 4. Renderer preflight (structural, skipped in dry run)
//! 5. Optional parallel prefetch
//! 6. Sequential per-attendee loop: primary QR, companion QR, render
//!
//! Only steps 1, 3 and 4 abort. A failing attendee is recorded and the loop
//! moves on.

use super::renderer::BadgeRenderer;
use super::source::RecordSource;
use crate::attendee::{validate_all, AttendeeRecord, ColumnMap, Rejection};
use crate::error::WorkflowError;
use crate::qr::{PrefetchCoordinator, PrefetchReport, QrResolver, ResolvedQr};
use crate::stats::RunStats;
use gafetes_common::{QrStrategy, TomlConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Knobs for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub strategy: QrStrategy,
    pub allow_fallback: bool,
    pub prefetch: bool,
    pub workers: usize,
    /// Validate and report only; no network, cache or output access
    pub dry_run: bool,
    pub max_attendees: usize,
}

impl RunOptions {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            strategy: config.qr.strategy,
            allow_fallback: config.qr.allow_fallback,
            prefetch: false,
            workers: config.qr.workers,
            dry_run: false,
            max_attendees: config.max_attendees(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Everything a finished run reports back
#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub rejections: Vec<Rejection>,
    /// Row numbers of valid attendees whose badges could not be produced
    pub failed_rows: Vec<usize>,
    pub prefetch: Option<PrefetchReport>,
    pub dry_run: bool,
}

impl RunReport {
    /// Any rejected or failed row
    pub fn has_failures(&self) -> bool {
        !self.rejections.is_empty() || !self.failed_rows.is_empty()
    }
}

pub struct BatchRunner {
    resolver: Arc<QrResolver>,
    renderer: Box<dyn BadgeRenderer>,
    options: RunOptions,
}

impl BatchRunner {
    pub fn new(
        resolver: Arc<QrResolver>,
        renderer: Box<dyn BadgeRenderer>,
        options: RunOptions,
    ) -> Self {
        Self {
            resolver,
            renderer,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn run(&self, source: &dyn RecordSource) -> Result<RunReport, WorkflowError> {
        let mut stats = RunStats::new();

        // Step 1: column gate
        let columns = ColumnMap::from_headers(source.headers()).map_err(|e| {
            error!("{}", e);
            e
        })?;

        // Step 2: validation
        let canonical: Vec<_> = source
            .rows()
            .iter()
            .map(|row| columns.canonicalize(row))
            .collect();
        let validation = validate_all(&canonical);

        for rejection in &validation.rejections {
            stats.record_processed();
            stats.record_skipped();
            stats.record_error(rejection.to_string());
        }

        // Step 3: attendee limit
        let attendees = validation.attendees;
        if attendees.len() > self.options.max_attendees {
            error!(
                count = attendees.len(),
                limit = self.options.max_attendees,
                "Too many attendees for one run"
            );
            return Err(WorkflowError::TooManyAttendees {
                count: attendees.len(),
                limit: self.options.max_attendees,
            });
        }

        info!(
            attendees = attendees.len(),
            with_companion = attendees.iter().filter(|a| a.has_companion()).count(),
            strategy = %self.options.strategy,
            allow_fallback = self.options.allow_fallback,
            "Attendees ready"
        );

        if self.options.dry_run {
            info!("Dry run: skipping QR resolution and badge output");
            for _ in &attendees {
                stats.record_processed();
            }
            return Ok(RunReport {
                stats,
                rejections: validation.rejections,
                failed_rows: Vec::new(),
                prefetch: None,
                dry_run: true,
            });
        }

        // Step 4: environment
        self.renderer.preflight().map_err(|e| {
            error!("{}", e);
            e
        })?;

        // Step 5: prefetch
        let prefetch = if self.options.prefetch {
            let identifiers: Vec<String> = attendees
                .iter()
                .flat_map(|a| a.qr_identifiers())
                .map(str::to_string)
                .collect();
            let coordinator = PrefetchCoordinator::new(Arc::clone(&self.resolver));
            Some(coordinator.prefetch_all(
                &identifiers,
                self.options.strategy,
                self.options.allow_fallback,
                self.options.workers,
            ))
        } else {
            None
        };

        // Step 6: per-attendee loop
        let mut failed_rows = Vec::new();
        let total = attendees.len();

        for (index, attendee) in attendees.iter().enumerate() {
            debug!(
                row = attendee.row_number,
                name = %attendee.full_name(),
                "Processing attendee {}/{}",
                index + 1,
                total
            );
            stats.record_processed();

            if let Err(message) = self.process(attendee, &mut stats) {
                error!(row = attendee.row_number, "{}", message);
                stats.record_skipped();
                stats.record_error(message);
                failed_rows.push(attendee.row_number);
            }
        }

        info!(
            processed = stats.rows_processed,
            skipped = stats.rows_skipped,
            badges = stats.total_badges(),
            "Batch complete"
        );

        Ok(RunReport {
            stats,
            rejections: validation.rejections,
            failed_rows,
            prefetch,
            dry_run: false,
        })
    }

    /// Resolve both QR codes and render; the error is the row's log line
    fn process(&self, attendee: &AttendeeRecord, stats: &mut RunStats) -> Result<(), String> {
        let fail = |what: &str, detail: String| {
            format!(
                "Fila {}: {} ({}): {}",
                attendee.row_number,
                attendee.full_name(),
                what,
                detail
            )
        };

        let primary = self
            .resolve(&attendee.qr, stats)
            .map_err(|e| fail("QR", e))?;
        if primary.provenance.is_fallback() {
            warn!(
                row = attendee.row_number,
                name = %attendee.full_name(),
                provenance = %primary.provenance,
                "Badge uses a locally generated QR (NOT valid for event scanning)"
            );
        }

        let companion = match &attendee.companion {
            Some(companion) => Some(
                self.resolve(&companion.qr, stats)
                    .map_err(|e| fail("QR acompañante", e))?,
            ),
            None => None,
        };
        if let Some(resolved) = companion.as_ref().filter(|r| r.provenance.is_fallback()) {
            warn!(
                row = attendee.row_number,
                provenance = %resolved.provenance,
                "Companion badge uses a locally generated QR (NOT valid for event scanning)"
            );
        }

        let badges = self
            .renderer
            .render(
                attendee,
                Some(&primary.bytes),
                companion.as_ref().map(|r| r.bytes.as_slice()),
            )
            .map_err(|e| fail("render", e.to_string()))?;

        for badge in &badges {
            stats.record_badge(badge.kind);
        }
        Ok(())
    }

    fn resolve(&self, identifier: &str, stats: &mut RunStats) -> Result<ResolvedQr, String> {
        let resolved = self
            .resolver
            .resolve(identifier, self.options.strategy, self.options.allow_fallback)
            .map_err(|e| e.to_string())?;
        stats.record_qr(resolved.provenance);
        Ok(resolved)
    }
}
