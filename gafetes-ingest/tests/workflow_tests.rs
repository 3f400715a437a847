//! End-to-end batch runs with a scripted QR source and the bundle renderer

mod helpers;

use gafetes_common::QrStrategy;
use gafetes_ingest::qr::FetchError;
use gafetes_ingest::workflow::{
    BatchRunner, BundleRenderer, JsonRecordSource, RunOptions,
};
use gafetes_ingest::WorkflowError;
use helpers::{file_names, resolver_with, MockQrSource, SERVER_PNG};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Four rows: a couple, a rejected row, a single attendee, a QR the server refuses
const ATTENDEES: &str = r#"[
    {"Puesto": "Director", "PrimerNombre": "Ana", "PrimerApellido": "García",
     "Oficina": "GDL", "Tour": "Tequila", "Mesa": "1", "LLevaConyugue": "SI",
     "PrimerNombreConyugue": "Luis", "PrimerApellidoConyugue": "Pérez",
     "QR": "QR100", "QR_Conyugue": "QR100C"},
    {"Puesto": "Gerente", "PrimerNombre": "", "PrimerApellido": "López",
     "Oficina": "MTY", "Tour": "", "Mesa": "2", "LLevaConyugue": "",
     "PrimerNombreConyugue": "", "PrimerApellidoConyugue": "",
     "QR": "QR101", "QR_Conyugue": ""},
    {"Puesto": "Asesor", "PrimerNombre": "Eva", "PrimerApellido": "Ruiz",
     "Oficina": "CDMX", "Tour": "", "Mesa": "3", "LLevaConyugue": "NO",
     "PrimerNombreConyugue": "", "PrimerApellidoConyugue": "",
     "QR": "QR102", "QR_Conyugue": ""},
    {"Puesto": "Asesor", "PrimerNombre": "Iván", "PrimerApellido": "Soto",
     "Oficina": "CDMX", "Tour": "", "Mesa": "4", "LLevaConyugue": "NO",
     "PrimerNombreConyugue": "", "PrimerApellidoConyugue": "",
     "QR": "BAD103", "QR_Conyugue": ""}
]"#;

struct Fixture {
    _root: TempDir,
    cache_dir: std::path::PathBuf,
    output_dir: std::path::PathBuf,
    source: Arc<MockQrSource>,
}

impl Fixture {
    fn new(source: MockQrSource) -> Self {
        let root = TempDir::new().unwrap();
        let cache_dir = root.path().join("qrs");
        let output_dir = root.path().join("gafetes");
        Self {
            _root: root,
            cache_dir,
            output_dir,
            source: Arc::new(source),
        }
    }

    fn runner(&self, options: RunOptions) -> BatchRunner {
        BatchRunner::new(
            Arc::new(resolver_with(self.source.clone(), &self.cache_dir)),
            Box::new(BundleRenderer::new(&self.output_dir)),
            options,
        )
    }
}

fn options(strategy: QrStrategy) -> RunOptions {
    RunOptions {
        strategy,
        ..RunOptions::default()
    }
}

fn attendees() -> JsonRecordSource {
    JsonRecordSource::from_json_str(ATTENDEES).unwrap()
}

fn exists(dir: &Path, name: &str) -> bool {
    dir.join(name).is_file()
}

#[test]
fn test_batch_continues_past_bad_rows() {
    let fixture = Fixture::new(MockQrSource::failing_for("BAD", SERVER_PNG));

    let report = fixture
        .runner(options(QrStrategy::Cache))
        .run(&attendees())
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].row_number, 3);
    assert_eq!(report.failed_rows, vec![5]);

    let stats = &report.stats;
    assert_eq!(stats.rows_processed, 4);
    assert_eq!(stats.rows_skipped, 2);
    assert_eq!(stats.primary_badges, 2);
    assert_eq!(stats.companion_badges, 1);
    assert_eq!(stats.qr_downloaded, 3);
    assert_eq!(stats.qr_generated_locally, 0);
    assert_eq!(stats.errors.len(), 2);
    assert!(stats.errors[0].message.starts_with("Fila 3: PrimerNombre vacío"));
    assert!(stats.errors[1].message.starts_with("Fila 5: Iván Soto"));
    assert_eq!(stats.success_rate(), Some(50.0));

    assert!(exists(&fixture.output_dir, "García_Ana.json"));
    assert!(exists(&fixture.output_dir, "García_Ana_qr.png"));
    assert!(exists(&fixture.output_dir, "Pérez_Luis_acompanante.json"));
    assert!(exists(&fixture.output_dir, "Pérez_Luis_acompanante_qr.png"));
    assert!(exists(&fixture.output_dir, "Ruiz_Eva.json"));
    assert!(!exists(&fixture.output_dir, "Soto_Iván.json"));

    assert_eq!(
        file_names(&fixture.cache_dir),
        vec!["QR100.png", "QR100C.png", "QR102.png"]
    );
}

#[test]
fn test_fallback_run_tallies_locally_generated_codes() {
    let fixture = Fixture::new(MockQrSource::failing_for("BAD", SERVER_PNG));
    let options = RunOptions {
        allow_fallback: true,
        ..options(QrStrategy::Cache)
    };

    let report = fixture.runner(options).run(&attendees()).unwrap();

    assert!(report.failed_rows.is_empty());
    assert_eq!(report.stats.primary_badges, 3);
    assert_eq!(report.stats.qr_downloaded, 3);
    assert_eq!(report.stats.qr_generated_locally, 1);
    assert!(file_names(&fixture.cache_dir).contains(&"BAD103_local.png".to_string()));
    assert!(!file_names(&fixture.cache_dir).contains(&"BAD103.png".to_string()));
    // Only the validation rejection remains a failure
    assert!(report.has_failures());
}

#[test]
fn test_prefetch_then_sequential_pass_uses_cache() {
    let fixture = Fixture::new(MockQrSource::serving(SERVER_PNG));
    let options = RunOptions {
        prefetch: true,
        workers: 4,
        ..options(QrStrategy::Cache)
    };

    let report = fixture.runner(options).run(&attendees()).unwrap();

    let prefetch = report.prefetch.as_ref().unwrap();
    assert_eq!(prefetch.len(), 4);
    assert_eq!(prefetch.succeeded(), 4);
    assert_eq!(fixture.source.calls(), 4);
    assert_eq!(report.stats.qr_from_cache, 4);
    assert_eq!(report.stats.qr_downloaded, 0);
}

#[test]
fn test_prefetch_with_download_strategy_fetches_again() {
    let fixture = Fixture::new(MockQrSource::serving(SERVER_PNG));
    let options = RunOptions {
        prefetch: true,
        ..options(QrStrategy::Download)
    };

    let report = fixture.runner(options).run(&attendees()).unwrap();

    assert_eq!(fixture.source.calls(), 8);
    assert_eq!(report.stats.qr_downloaded, 4);
    assert!(file_names(&fixture.cache_dir).is_empty());
}

#[test]
fn test_missing_columns_abort_before_any_row() {
    let fixture = Fixture::new(MockQrSource::serving(SERVER_PNG));
    let source =
        JsonRecordSource::from_json_str(r#"[{"PrimerNombre": "Ana", "QR": "QR1"}]"#).unwrap();

    let err = fixture
        .runner(options(QrStrategy::Cache))
        .run(&source)
        .unwrap_err();

    match err {
        WorkflowError::MissingColumns(missing) => {
            assert!(missing.missing.contains(&"PrimerApellido".to_string()));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(fixture.source.calls(), 0);
    assert!(!fixture.output_dir.exists());
}

#[test]
fn test_attendee_limit_is_structural() {
    let fixture = Fixture::new(MockQrSource::serving(SERVER_PNG));
    let options = RunOptions {
        max_attendees: 2,
        ..options(QrStrategy::Cache)
    };

    let err = fixture.runner(options).run(&attendees()).unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::TooManyAttendees { count: 3, limit: 2 }
    ));
    assert_eq!(fixture.source.calls(), 0);
}

#[test]
fn test_unusable_output_directory_aborts() {
    let fixture = Fixture::new(MockQrSource::serving(SERVER_PNG));
    std::fs::create_dir_all(fixture.output_dir.parent().unwrap()).unwrap();
    std::fs::write(&fixture.output_dir, b"not a directory").unwrap();

    let err = fixture
        .runner(options(QrStrategy::Cache))
        .run(&attendees())
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Preflight(_)));
    assert_eq!(fixture.source.calls(), 0);
}

#[test]
fn test_dry_run_touches_nothing() {
    let fixture = Fixture::new(MockQrSource::failing(FetchError::Timeout));
    let options = RunOptions {
        dry_run: true,
        prefetch: true,
        ..options(QrStrategy::Cache)
    };

    let report = fixture.runner(options).run(&attendees()).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.stats.rows_processed, 4);
    assert_eq!(report.stats.rows_skipped, 1);
    assert_eq!(report.stats.total_badges(), 0);
    assert!(report.prefetch.is_none());
    assert_eq!(fixture.source.calls(), 0);
    assert!(!fixture.output_dir.exists());
    assert!(!fixture.cache_dir.exists());
}
