//! Log output of the loader.
//!
//! Runs in its own test binary because it installs a global logger.

use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

use gameplay_features::{
    ExtractionMode, ExtractorCatalog, ExtractorConfig, ExtractorLoader, ExtractorRegistry,
    FeatureRegistry, GameSchema,
};

/// Keeps every record for later inspection.
struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

/// Test that a skipped entry produces exactly one ERROR line naming the
/// bad type, and the rest still load.
#[test]
fn test_unknown_type_logs_one_error() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let schema = GameSchema::new("TEST")
        .with_aggregate_feature(
            "Clicks",
            ExtractorConfig::new("CountEvent").with_arg("target_event", "click"),
        )
        .with_aggregate_feature("Mystery", ExtractorConfig::new("DoesNotExist"))
        .with_aggregate_feature(
            "Moves",
            ExtractorConfig::new("CountEvent").with_arg("target_event", "move"),
        )
        .with_aggregate_feature(
            "Quits",
            ExtractorConfig::new("CountEvent").with_arg("target_event", "quit"),
        );
    let loader = ExtractorLoader::new(
        Arc::new(schema),
        Arc::new(ExtractorCatalog::builtin()),
        ExtractionMode::Session,
    );

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader.load_to_feature_registry(&mut registry).unwrap();
    assert_eq!(registry.extractor_names(), vec!["Clicks", "Moves", "Quits"]);

    let records = LOGGER.records.lock().unwrap();
    let errors: Vec<&String> = records
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, message)| message)
        .collect();
    assert_eq!(errors.len(), 1, "errors: {errors:?}");
    assert!(errors[0].contains("Mystery"));
    assert!(errors[0].contains("DoesNotExist"));
}
