//! QR identifier classification
//!
//! An identifier from the attendee sheet is one of:
//! - a path to an existing local file
//! - a fully-qualified URL (has a scheme prefix)
//! - a bare code substituted into the configured URL template
//!
//! Classification order matters: a local file wins even if the text also
//! looks like something else.

use gafetes_common::QrSettings;
use std::path::{Path, PathBuf};

/// Path segment of the event download endpoint; the component after it is the code
pub const DOWNLOAD_SEGMENT: &str = "/downloadQr/";

/// Characters replaced with `_` when deriving a cache key
const REPLACED_CHARS: [char; 8] = ['/', '\\', '<', '>', '"', '|', '?', '*'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrIdentifier {
    LocalFile(PathBuf),
    Url(String),
    Code(String),
}

impl QrIdentifier {
    /// Classify a raw identifier string (surrounding whitespace ignored)
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        let path = Path::new(raw);

        if !raw.is_empty() && path.is_file() {
            return QrIdentifier::LocalFile(path.to_path_buf());
        }

        if has_scheme(raw) {
            QrIdentifier::Url(raw.to_string())
        } else {
            QrIdentifier::Code(raw.to_string())
        }
    }

    /// Flat-directory cache key, or `None` for local files (never cached)
    ///
    /// - URL containing [`DOWNLOAD_SEGMENT`]: the path component after the
    ///   last occurrence, trailing slashes removed
    /// - any other URL: the sanitised full URL
    /// - bare code: the sanitised code
    pub fn cache_key(&self) -> Option<String> {
        match self {
            QrIdentifier::LocalFile(_) => None,
            QrIdentifier::Url(url) => {
                let tail = url
                    .rsplit_once(DOWNLOAD_SEGMENT)
                    .map(|(_, tail)| tail.trim_end_matches('/'))
                    .filter(|tail| !tail.is_empty());
                Some(sanitize_key(tail.unwrap_or(url)))
            }
            QrIdentifier::Code(code) => Some(sanitize_key(code)),
        }
    }

    /// URL to download from, or `None` for local files
    pub fn resolution_url(&self, settings: &QrSettings) -> Option<String> {
        match self {
            QrIdentifier::LocalFile(_) => None,
            QrIdentifier::Url(url) => Some(url.clone()),
            QrIdentifier::Code(code) => Some(settings.url_for(code)),
        }
    }
}

fn has_scheme(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Make an identifier safe to use as a single file name
///
/// Path separators and reserved characters become `_`, colons are dropped.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':')
        .map(|c| if REPLACED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
