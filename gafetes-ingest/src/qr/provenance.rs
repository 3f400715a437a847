//! Provenance tags for resolved QR images

use serde::Serialize;
use std::fmt;

/// How a QR image was obtained
///
/// `CacheFallback` and `GeneratedFallback` images were synthesised locally
/// and are NOT valid for scanning at the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QrProvenance {
    LocalFile,
    CacheValid,
    CacheFallback,
    Downloaded,
    GeneratedFallback,
}

impl QrProvenance {
    pub const ALL: [QrProvenance; 5] = [
        QrProvenance::LocalFile,
        QrProvenance::CacheValid,
        QrProvenance::CacheFallback,
        QrProvenance::Downloaded,
        QrProvenance::GeneratedFallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QrProvenance::LocalFile => "local-file",
            QrProvenance::CacheValid => "cache-valid",
            QrProvenance::CacheFallback => "cache-fallback",
            QrProvenance::Downloaded => "downloaded",
            QrProvenance::GeneratedFallback => "generated-fallback",
        }
    }

    /// Locally synthesised, not scannable at the event
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            QrProvenance::CacheFallback | QrProvenance::GeneratedFallback
        )
    }

    pub fn is_event_valid(&self) -> bool {
        !self.is_fallback()
    }
}

impl fmt::Display for QrProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image bytes plus the provenance they must always travel with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQr {
    pub bytes: Vec<u8>,
    pub provenance: QrProvenance,
}

impl ResolvedQr {
    pub fn new(bytes: Vec<u8>, provenance: QrProvenance) -> Self {
        Self { bytes, provenance }
    }
}
