//! Configuration model and TOML loading
//!
//! Resolution order for every setting:
//! 1. Command-line argument (highest priority, handled by the binary)
//! 2. Environment variable (`GAFETES_*`, handled by the binary)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns tiers 3 and 4. A missing config file is never fatal;
//! a config file that exists but does not parse is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Placeholder substituted with a bare QR code in [`QrSettings::base_url`]
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Default event download endpoint
pub const DEFAULT_QR_BASE_URL: &str =
    "https://evento-directores.qualitaseventos.mx/downloadQr/{code}/";

/// Default upper bound on validated attendees per run
pub const DEFAULT_MAX_ATTENDEES: usize = 10_000;

/// Upper bound for `qr.canvas_size`, in pixels
pub const MAX_CANVAS_SIZE: u32 = 4096;

/// Upper bound for `qr.module_size` and `qr.border`
pub const MAX_MODULE_SETTING: u32 = 100;

/// QR acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrStrategy {
    /// Fetch every time, never persist
    #[default]
    Download,
    /// Persist under the valid / fallback cache tiers and reuse valid entries
    Cache,
}

impl QrStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrStrategy::Download => "download",
            QrStrategy::Cache => "cache",
        }
    }
}

impl std::fmt::Display for QrStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[qr]` section: download, retry, local generation and cache policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrSettings {
    /// URL template; `{code}` is replaced by the bare QR code
    pub base_url: String,
    /// Per-attempt download timeout (seconds)
    pub timeout_secs: u64,
    /// Total download attempts per identifier
    pub max_attempts: u32,
    /// Delay between failed attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// Pixels per QR module for local generation
    pub module_size: u32,
    /// Quiet-zone width in modules for local generation
    pub border: u32,
    /// Side of the square PNG produced by local generation (pixels)
    pub canvas_size: u32,
    /// Prefetch worker pool width
    pub workers: usize,
    /// Age threshold for cache purge (days)
    pub cache_max_age_days: u64,
    pub strategy: QrStrategy,
    /// Allow scan-invalid local generation when the server is unreachable
    pub allow_fallback: bool,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_QR_BASE_URL.to_string(),
            timeout_secs: 10,
            max_attempts: 2,
            retry_delay_ms: 1000,
            module_size: 10,
            border: 4,
            canvas_size: 200,
            workers: 8,
            cache_max_age_days: 30,
            strategy: QrStrategy::Download,
            allow_fallback: false,
        }
    }
}

impl QrSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Substitute a bare code into the URL template
    pub fn url_for(&self, code: &str) -> String {
        self.base_url.replace(CODE_PLACEHOLDER, code)
    }

    /// Reject settings the resolver cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.contains(CODE_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "qr.base_url must contain {}: {}",
                CODE_PLACEHOLDER, self.base_url
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("qr.max_attempts must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("qr.workers must be at least 1".to_string()));
        }
        if self.canvas_size == 0 || self.module_size == 0 {
            return Err(Error::Config(
                "qr.canvas_size and qr.module_size must be non-zero".to_string(),
            ));
        }
        if self.canvas_size > MAX_CANVAS_SIZE {
            return Err(Error::Config(format!(
                "qr.canvas_size must be at most {}: {}",
                MAX_CANVAS_SIZE, self.canvas_size
            )));
        }
        if self.module_size > MAX_MODULE_SETTING || self.border > MAX_MODULE_SETTING {
            return Err(Error::Config(format!(
                "qr.module_size and qr.border must be at most {}",
                MAX_MODULE_SETTING
            )));
        }
        Ok(())
    }
}

/// `[paths]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Flat directory holding `{key}.png` / `{key}_local.png`
    pub cache_dir: PathBuf,
    /// Destination for badge bundles and run summaries
    pub output_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("qrs"),
            output_dir: PathBuf::from("gafetes"),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "debug")
    pub level: String,
    /// Optional file that receives a plain-text copy of the log
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Root of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Abort the run when more validated attendees than this are read
    pub max_attendees: Option<usize>,
    pub qr: QrSettings,
    pub paths: PathSettings,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Locate the config file without reading it
    ///
    /// An explicit path must exist. Without one, the platform config file
    /// is returned when present; `Ok(None)` means compiled defaults apply.
    pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        match explicit {
            Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
            Some(path) => Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            ))),
            None => Ok(default_config_path().filter(|p| p.exists())),
        }
    }

    /// Locate and parse configuration, falling back to compiled defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit)? {
            Some(path) => {
                let config = Self::from_file(&path)?;
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML file; absent keys take their compiled defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        Ok(config)
    }

    pub fn max_attendees(&self) -> usize {
        self.max_attendees.unwrap_or(DEFAULT_MAX_ATTENDEES)
    }

    /// Multi-line human-readable overview printed at startup
    pub fn summary(&self) -> String {
        let lines = [
            "=".repeat(60),
            "CONFIGURATION".to_string(),
            "=".repeat(60),
            "QR:".to_string(),
            format!("   URL template: {}", self.qr.base_url),
            format!("   Strategy: {}", self.qr.strategy),
            format!("   Timeout: {}s", self.qr.timeout_secs),
            format!("   Attempts: {}", self.qr.max_attempts),
            format!("   Fallback allowed: {}", self.qr.allow_fallback),
            "Paths:".to_string(),
            format!("   Cache: {}", self.paths.cache_dir.display()),
            format!("   Output: {}", self.paths.output_dir.display()),
            "System:".to_string(),
            format!("   Max attendees: {}", self.max_attendees()),
            format!("   Workers: {}", self.qr.workers),
            "=".repeat(60),
        ];
        lines.join("\n")
    }
}

/// Platform config file: `<config dir>/gafetes/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gafetes").join("config.toml"))
}
