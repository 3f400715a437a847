//! QR resolution
//!
//! Short-circuit order for one identifier:
//! 1. Existing local file → `local-file` (cache untouched)
//! 2. Derive cache key and download URL
//! 3. Cache strategy + valid entry → `cache-valid`
//!    (a fallback entry alone never short-circuits)
//! 4. Download with retry
//! 5. Success → persist to the valid tier (cache strategy) → `downloaded`
//! 6. Failure → `ServerUnreachable` when fallback is disallowed; otherwise
//!    reuse an existing fallback entry (`cache-fallback`) or synthesise one
//!    (`generated-fallback`), persisting only to the fallback tier
//!
//! Fallback images never reach `{key}.png`.

use super::cache::{CacheTier, FsQrCache, QrStore};
use super::generator::QrGenerator;
use super::identifier::QrIdentifier;
use super::provenance::{QrProvenance, ResolvedQr};
use super::source::{FetchError, HttpQrSource, QrSource};
use crate::error::QrError;
use gafetes_common::{QrSettings, QrStrategy};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Resolves identifiers to provenance-tagged image bytes
///
/// Cheap to share across threads behind an `Arc`.
pub struct QrResolver {
    settings: QrSettings,
    source: Arc<dyn QrSource>,
    cache: Arc<dyn QrStore>,
    generator: QrGenerator,
}

impl QrResolver {
    pub fn new(settings: QrSettings, source: Arc<dyn QrSource>, cache: Arc<dyn QrStore>) -> Self {
        let generator = QrGenerator::from_settings(&settings);
        Self {
            settings,
            source,
            cache,
            generator,
        }
    }

    /// Resolver over the real HTTP source and a directory cache
    pub fn with_http(settings: QrSettings, cache_dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let source = HttpQrSource::new(settings.timeout())?;
        Ok(Self::new(
            settings,
            Arc::new(source),
            Arc::new(FsQrCache::new(cache_dir)),
        ))
    }

    pub fn settings(&self) -> &QrSettings {
        &self.settings
    }

    /// Resolve one identifier
    ///
    /// The only error is [`QrError::ServerUnreachable`] (fallback disallowed)
    /// or, when fallback is allowed, a failed local generation.
    pub fn resolve(
        &self,
        identifier: &str,
        strategy: QrStrategy,
        allow_fallback: bool,
    ) -> Result<ResolvedQr, QrError> {
        let classified = QrIdentifier::classify(identifier);

        // Step 1: local file
        if let QrIdentifier::LocalFile(path) = &classified {
            match std::fs::read(path) {
                Ok(bytes) => {
                    debug!(path = %path.display(), "Using local QR file");
                    return Ok(ResolvedQr::new(bytes, QrProvenance::LocalFile));
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Local QR file unreadable, resolving as code"
                    );
                }
            }
        }

        // Step 2: key and URL
        let (key, url) = match &classified {
            QrIdentifier::LocalFile(_) => {
                let code = QrIdentifier::Code(identifier.trim().to_string());
                (
                    code.cache_key().unwrap_or_default(),
                    code.resolution_url(&self.settings).unwrap_or_default(),
                )
            }
            other => (
                other.cache_key().unwrap_or_default(),
                other.resolution_url(&self.settings).unwrap_or_default(),
            ),
        };
        let use_cache = strategy == QrStrategy::Cache;

        // Step 3: valid cache entry
        if use_cache {
            if let Some(bytes) = self.cache.read(&key, CacheTier::Valid) {
                debug!(key = %key, "QR served from cache");
                return Ok(ResolvedQr::new(bytes, QrProvenance::CacheValid));
            }
        }

        // Step 4: download
        if let Some(bytes) = self.download_with_retry(&url) {
            // Step 5: persist to the valid tier
            if use_cache {
                self.store(&key, CacheTier::Valid, &bytes);
            }
            info!(key = %key, bytes = bytes.len(), "QR downloaded");
            return Ok(ResolvedQr::new(bytes, QrProvenance::Downloaded));
        }

        // Step 6: fallback gate
        if !allow_fallback {
            error!(
                key = %key,
                url = %url,
                "QR server unreachable and local fallback disallowed"
            );
            return Err(QrError::ServerUnreachable {
                key,
                url,
                attempts: self.settings.max_attempts,
            });
        }

        if use_cache {
            if let Some(bytes) = self.cache.read(&key, CacheTier::Fallback) {
                warn!(
                    key = %key,
                    "Server unreachable, reusing locally generated QR (NOT valid for event scanning)"
                );
                return Ok(ResolvedQr::new(bytes, QrProvenance::CacheFallback));
            }
        }

        warn!(
            key = %key,
            "Server unreachable, generating QR locally (NOT valid for event scanning)"
        );
        let bytes = self.generator.generate(identifier.trim())?;
        if use_cache {
            self.store(&key, CacheTier::Fallback, &bytes);
        }
        Ok(ResolvedQr::new(bytes, QrProvenance::GeneratedFallback))
    }

    /// Up to `max_attempts` downloads with a fixed delay between them
    ///
    /// Exhaustion is an expected outcome and yields `None`.
    pub fn download_with_retry(&self, url: &str) -> Option<Vec<u8>> {
        let attempts = self.settings.max_attempts;

        for attempt in 1..=attempts {
            match self.source.fetch(url) {
                Ok(bytes) => {
                    if attempt > 1 {
                        debug!(url = %url, attempt, "Download succeeded after retry");
                    }
                    return Some(bytes);
                }
                Err(e) => {
                    warn!(url = %url, attempt, max_attempts = attempts, error = %e, "QR download attempt failed");
                    if attempt < attempts {
                        std::thread::sleep(self.settings.retry_delay());
                    }
                }
            }
        }

        None
    }

    fn store(&self, key: &str, tier: CacheTier, bytes: &[u8]) {
        if let Err(e) = self.cache.write(key, tier, bytes) {
            warn!(key = %key, error = %e, "Cache write failed, continuing without caching");
        }
    }
}

impl std::fmt::Debug for QrResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrResolver")
            .field("settings", &self.settings)
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}
