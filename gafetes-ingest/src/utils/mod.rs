//! File helpers shared by the cache and the bundle renderer

use std::io::Write;
use std::path::Path;

/// Name used when a person has no usable name characters at all
pub const EMPTY_STEM: &str = "sin_nombre";

/// Temp files from [`atomic_write`] are named `{TEMP_PREFIX}*{TEMP_SUFFIX}`
pub const TEMP_PREFIX: &str = ".gafetes-";
pub const TEMP_SUFFIX: &str = ".tmp";

/// Write `bytes` to `path` through a sibling temp file and an atomic rename
///
/// The parent directory must already exist.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// True for a temp file an interrupted [`atomic_write`] left behind
pub fn is_write_leftover(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX))
            .unwrap_or(false)
}

/// Turn free text into a portable file stem
///
/// Reserved characters are stripped, whitespace runs become `_`.
pub fn sanitize_file_stem(raw: &str) -> String {
    let cleaned = sanitize_filename::sanitize(raw.trim());
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        EMPTY_STEM.to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_leftover_matches_temp_naming_only() {
        let dir = TempDir::new().unwrap();
        for name in [".gafetes-x1.tmp", "QR1.png", "gafetes-x1.tmp", ".gafetes-x1"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        assert!(is_write_leftover(&dir.path().join(".gafetes-x1.tmp")));
        assert!(!is_write_leftover(&dir.path().join("QR1.png")));
        assert!(!is_write_leftover(&dir.path().join("gafetes-x1.tmp")));
        assert!(!is_write_leftover(&dir.path().join(".gafetes-x1")));
        assert!(!is_write_leftover(&dir.path().join(".gafetes-missing.tmp")));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_atomic_write_missing_parent_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.json");
        assert!(atomic_write(&path, b"x").is_err());
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("García López_Ana María"), "García_López_Ana_María");
        assert_eq!(sanitize_file_stem("a/b:c"), "abc");
        assert_eq!(sanitize_file_stem("   "), EMPTY_STEM);
        assert_eq!(sanitize_file_stem("///"), EMPTY_STEM);
    }
}
