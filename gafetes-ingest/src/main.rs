//! gafetes - attendee validation and QR acquisition for event badges
//!
//! **Usage:**
//! ```bash
//! gafetes --input asistentes.json [--qr-strategy cache] [--prefetch] [--allow-fallback]
//! ```
//!
//! Exit status: 0 all rows produced, 1 some rows rejected or failed,
//! 2 run aborted before processing (configuration, input, columns,
//! output directory).

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gafetes_common::{config::TomlConfig, logging, time, QrStrategy};
use gafetes_ingest::qr::{clean_cache, QrResolver};
use gafetes_ingest::workflow::{BatchRunner, BundleRenderer, JsonRecordSource, RunOptions, RunReport};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Base name of the persisted run summary inside the output directory
const SUMMARY_FILE: &str = "resumen_generacion.txt";

/// Command-line arguments; every option can also come from a `GAFETES_*` variable
#[derive(Parser, Debug)]
#[command(name = "gafetes")]
#[command(about = "Validate attendees and acquire QR codes for event badges")]
#[command(version)]
struct Args {
    /// Attendee records (JSON array exported from the sheet)
    #[arg(short, long, env = "GAFETES_INPUT")]
    input: PathBuf,

    /// TOML config file (default: <config dir>/gafetes/config.toml)
    #[arg(short, long, env = "GAFETES_CONFIG")]
    config: Option<PathBuf>,

    /// QR acquisition strategy
    #[arg(long, value_enum, env = "GAFETES_QR_STRATEGY")]
    qr_strategy: Option<StrategyArg>,

    /// Download URL template containing {code}
    #[arg(long, env = "GAFETES_QR_BASE_URL")]
    qr_base_url: Option<String>,

    /// QR cache directory
    #[arg(long, env = "GAFETES_QRS_DIR")]
    qrs_dir: Option<PathBuf>,

    /// Badge bundle output directory
    #[arg(short, long, env = "GAFETES_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Prefetch worker count
    #[arg(long, env = "GAFETES_WORKERS")]
    workers: Option<usize>,

    /// Generate QR codes locally when the server is unreachable (NOT valid for scanning)
    #[arg(long, env = "GAFETES_ALLOW_FALLBACK")]
    allow_fallback: bool,

    /// Resolve every QR code in parallel before generating badges
    #[arg(long, env = "GAFETES_PREFETCH")]
    prefetch: bool,

    /// Purge old cache entries before the batch
    #[arg(long, env = "GAFETES_CLEAN_CACHE")]
    clean_cache: bool,

    /// Age threshold for --clean-cache (days)
    #[arg(long, env = "GAFETES_CACHE_MAX_AGE_DAYS")]
    cache_max_age_days: Option<u64>,

    /// Validate and report without network, cache or output access
    #[arg(long, env = "GAFETES_DRY_RUN")]
    dry_run: bool,

    /// Log filter directive (overridden by RUST_LOG)
    #[arg(long, env = "GAFETES_LOG_LEVEL")]
    log_level: Option<String>,

    /// Append a plain-text copy of the log to this file
    #[arg(long, env = "GAFETES_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Download,
    Cache,
}

impl From<StrategyArg> for QrStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Download => QrStrategy::Download,
            StrategyArg::Cache => QrStrategy::Cache,
        }
    }
}

/// Layer command-line / environment values over the file configuration
fn apply_overrides(config: &mut TomlConfig, args: &Args) {
    if let Some(strategy) = args.qr_strategy {
        config.qr.strategy = strategy.into();
    }
    if let Some(url) = &args.qr_base_url {
        config.qr.base_url = url.clone();
    }
    if let Some(dir) = &args.qrs_dir {
        config.paths.cache_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.paths.output_dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        config.qr.workers = workers;
    }
    if args.allow_fallback {
        config.qr.allow_fallback = true;
    }
    if let Some(days) = args.cache_max_age_days {
        config.qr.cache_max_age_days = days;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(file) = &args.log_file {
        config.logging.file = Some(file.clone());
    }
}

/// Resolve configuration and install logging
///
/// Nothing is logged before the subscriber exists, so the config origin is
/// reported afterwards.
fn setup(args: &Args) -> Result<TomlConfig> {
    let located = TomlConfig::locate(args.config.as_deref())?;
    let mut config = match &located {
        Some(path) => TomlConfig::from_file(path)?,
        None => TomlConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.qr.validate()?;

    logging::init(&config.logging).context("Failed to initialise logging")?;

    match &located {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }
    Ok(config)
}

fn run(args: &Args, config: &TomlConfig) -> Result<RunReport> {
    info!(
        "gafetes v{} starting at {}",
        env!("CARGO_PKG_VERSION"),
        time::display_stamp(time::now())
    );
    for line in config.summary().lines() {
        info!("{}", line);
    }

    if config.qr.allow_fallback {
        warn!("Local QR fallback enabled: generated codes are NOT valid for event scanning");
    }

    if args.clean_cache {
        if args.dry_run {
            info!("Dry run: cache cleanup skipped");
        } else {
            let deleted = clean_cache(&config.paths.cache_dir, config.qr.cache_max_age_days);
            info!("Removed {} cached QR file(s)", deleted);
        }
    }

    let source = JsonRecordSource::from_path(&args.input)
        .with_context(|| format!("Failed to read attendees from {}", args.input.display()))?;

    let resolver = QrResolver::with_http(config.qr.clone(), config.paths.cache_dir.clone())
        .context("Failed to initialise QR resolver")?;

    let options = RunOptions {
        prefetch: args.prefetch,
        dry_run: args.dry_run,
        ..RunOptions::from_config(config)
    };

    let runner = BatchRunner::new(
        Arc::new(resolver),
        Box::new(BundleRenderer::new(config.paths.output_dir.clone())),
        options,
    );

    let report = runner.run(&source)?;
    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match setup(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let report = match run(&args, &config) {
        Ok(report) => report,
        Err(e) => {
            error!("Run aborted: {:#}", e);
            return ExitCode::from(2);
        }
    };

    println!("{}", report.stats.summary());

    if !report.dry_run && report.stats.rows_processed > 0 {
        let base = config.paths.output_dir.join(SUMMARY_FILE);
        if let Err(e) = report.stats.persist(&base) {
            warn!(error = %e, "Could not save run summary");
        }
    }

    if report.has_failures() {
        warn!(
            rejected = report.rejections.len(),
            failed = report.failed_rows.len(),
            "Run finished with failures"
        );
        ExitCode::from(1)
    } else {
        info!("Run finished successfully");
        ExitCode::SUCCESS
    }
}
