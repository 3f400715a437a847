//! Parallel QR prefetch
//!
//! Resolves a batch of identifiers on a bounded rayon pool before the
//! sequential per-attendee loop, warming the cache. Each identifier gets its
//! own result slot; the map is assembled after every worker is done.

use super::provenance::ResolvedQr;
use super::resolver::QrResolver;
use crate::error::QrError;
use gafetes_common::QrStrategy;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of one prefetch batch, keyed by identifier
#[derive(Debug, Default)]
pub struct PrefetchReport {
    pub outcomes: HashMap<String, Result<ResolvedQr, QrError>>,
}

impl PrefetchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Successful outcomes carrying scan-invalid images
    pub fn fallbacks(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, Ok(r) if r.provenance.is_fallback()))
            .count()
    }

    pub fn get(&self, identifier: &str) -> Option<&Result<ResolvedQr, QrError>> {
        self.outcomes.get(identifier)
    }

    /// Build from outcomes in input order; a later duplicate replaces an earlier one
    fn from_ordered(results: Vec<(String, Result<ResolvedQr, QrError>)>) -> Self {
        let mut report = Self::default();
        for (id, outcome) in results {
            report.outcomes.insert(id, outcome);
        }
        report
    }
}

pub struct PrefetchCoordinator {
    resolver: Arc<QrResolver>,
}

impl PrefetchCoordinator {
    pub fn new(resolver: Arc<QrResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve every identifier with at most `concurrency` workers
    ///
    /// Never fails as a whole: each identifier's error is captured in its
    /// own entry. Duplicate identifiers collapse to one entry, the later
    /// input position winning.
    pub fn prefetch_all(
        &self,
        identifiers: &[String],
        strategy: QrStrategy,
        allow_fallback: bool,
        concurrency: usize,
    ) -> PrefetchReport {
        let started = Instant::now();
        let workers = concurrency.max(1);

        info!(
            identifiers = identifiers.len(),
            workers,
            strategy = %strategy,
            "Prefetching QR codes"
        );

        if strategy == QrStrategy::Download {
            warn!("Prefetch with the download strategy does not persist; codes will be fetched again per attendee");
        }

        let resolve_all = || -> Vec<(String, Result<ResolvedQr, QrError>)> {
            identifiers
                .par_iter()
                .map(|id| (id.clone(), self.resolver.resolve(id, strategy, allow_fallback)))
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("qr-prefetch-{}", i))
            .build()
        {
            Ok(pool) => pool.install(resolve_all),
            Err(e) => {
                warn!(error = %e, "Cannot build prefetch pool, using the global pool");
                resolve_all()
            }
        };

        let report = PrefetchReport::from_ordered(results);

        let succeeded = report.succeeded();
        let failed = report.failed();
        info!(
            succeeded,
            total = report.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prefetch complete: {}/{}",
            succeeded,
            report.len()
        );

        if failed > 0 && !allow_fallback {
            error!(
                failed,
                "Prefetch failures with fallback disallowed: these badges will be missing event-valid QR codes"
            );
        }

        let fallbacks = report.fallbacks();
        if fallbacks > 0 {
            warn!(
                fallbacks,
                "Locally generated QR codes in prefetch (NOT valid for event scanning)"
            );
        }

        report
    }
}
