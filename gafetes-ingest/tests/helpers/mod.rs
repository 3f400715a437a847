//! Test Helper Utilities
//!
//! Shared utilities for the gafetes-ingest integration tests

#![allow(dead_code)]

pub mod http_stub;
pub mod log_capture;
pub mod mock_source;

#[allow(unused_imports)]
pub use log_capture::{capture_logs, LogCapture};
#[allow(unused_imports)]
pub use mock_source::MockQrSource;

use gafetes_common::QrSettings;
use gafetes_ingest::qr::{FsQrCache, QrResolver};
use std::path::Path;
use std::sync::Arc;

/// Bytes served by mock sources in place of a real PNG
pub const SERVER_PNG: &[u8] = b"\x89PNG\r\n\x1a\nserver-image";

/// Settings with no retry delay and a test URL template
pub fn fast_settings() -> QrSettings {
    QrSettings {
        base_url: "http://qr.test/downloadQr/{code}/".to_string(),
        retry_delay_ms: 0,
        ..QrSettings::default()
    }
}

/// Resolver over a mock source and a directory cache
pub fn resolver_with(source: Arc<MockQrSource>, cache_dir: &Path) -> QrResolver {
    QrResolver::new(
        fast_settings(),
        source,
        Arc::new(FsQrCache::new(cache_dir)),
    )
}

/// File names in a directory, sorted; empty if the directory is absent
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
