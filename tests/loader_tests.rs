//! Loader integration tests.
//!
//! These tests build registries from schemas: per-count expansion, mode
//! and override filtering, graceful skipping of bad entries, and per-unit
//! shared state.

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use rustc_hash::FxHashMap;
use serde_json::json;

use gameplay_features::{
    Count, CountFilterConfig, DetectorRegistry, Enabled, Event, ExtractionMode, ExtractorCatalog,
    ExtractorConfig, ExtractorLoader, ExtractorRegistry, Feature, FeatureRegistry, FeatureValue,
    GameSchema, LoadError, MappingTable,
};

// =============================================================================
// Helpers
// =============================================================================

fn count_event(target: &str) -> ExtractorConfig {
    ExtractorConfig::new("CountEvent").with_arg("target_event", target)
}

fn loader(schema: GameSchema, mode: ExtractionMode) -> ExtractorLoader {
    ExtractorLoader::new(Arc::new(schema), Arc::new(ExtractorCatalog::builtin()), mode)
}

fn event(name: &str, secs: i64) -> Event {
    Event::new("s1", name, Utc.timestamp_opt(secs, 0).single().unwrap())
}

// =============================================================================
// Graceful Degradation
// =============================================================================

/// Test that one unknown type among three valid ones is skipped.
#[test]
fn test_unknown_type_is_skipped() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature("Clicks", count_event("click"))
        .with_aggregate_feature("Broken", ExtractorConfig::new("DoesNotExist"))
        .with_aggregate_feature("Moves", count_event("move"))
        .with_aggregate_feature("Duration", ExtractorConfig::new("SessionDuration"));

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    let report = loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    assert_eq!(
        registry.extractor_names(),
        vec!["Clicks", "Moves", "Duration", "Duration-EventCount"]
    );
    assert_eq!(report.loaded, vec!["Clicks", "Moves", "Duration"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "Broken");
    assert_eq!(
        report.skipped[0].error,
        LoadError::UnknownExtractorType {
            kind: "feature",
            extractor_type: "DoesNotExist".into(),
        }
    );
    assert!(!report.is_clean());
}

/// Test that bad arguments and missing per-count fields skip only their
/// own entry.
#[test]
fn test_bad_entries_are_skipped() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature("NoTarget", ExtractorConfig::new("CountEvent"))
        .with_per_count_feature("NoPrefix", count_event("x").with_count(Count::Fixed(2)))
        .with_per_count_feature("NoCount", count_event("x").with_prefix("p"))
        .with_per_count_feature(
            "NoLevels",
            count_event("x").with_prefix("lvl").with_count(Count::LevelRange),
        )
        .with_per_count_feature(
            "NoTable",
            count_event("x")
                .with_prefix("job")
                .with_count(Count::Fixed(2))
                .with_filter(CountFilterConfig::Mapped {
                    key: "job".into(),
                    table: "jobs".into(),
                }),
        )
        .with_aggregate_feature("Fine", count_event("x"));

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    let report = loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    assert_eq!(registry.extractor_names(), vec!["Fine"]);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.name.as_str()).collect();
    // Entry-level failures are reported by base name, instance-level ones
    // by instance name.
    assert_eq!(
        skipped,
        vec!["NoTarget", "NoPrefix", "NoCount", "NoLevels", "job0_NoTable", "job1_NoTable"]
    );
    assert!(matches!(report.skipped[0].error, LoadError::MissingSchemaField { .. }));
    assert!(matches!(report.skipped[3].error, LoadError::InvalidSchemaField { .. }));
    assert_eq!(report.skipped[4].error, LoadError::UnknownMapping("jobs".into()));
}

/// Test that an instance name clashing with an earlier entry is skipped
/// and later instances still load.
#[test]
fn test_duplicate_instance_name_is_skipped() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature("lvl0_Starts", count_event("begin"))
        .with_aggregate_feature("Clicks", count_event("click"))
        .with_per_count_feature(
            "Starts",
            count_event("begin").with_prefix("lvl").with_count(Count::Fixed(2)),
        );

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    let report = loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    assert_eq!(registry.extractor_names(), vec!["lvl0_Starts", "Clicks", "lvl1_Starts"]);
    assert_eq!(report.loaded, vec!["lvl0_Starts", "Clicks", "lvl1_Starts"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "lvl0_Starts");
    assert_eq!(report.skipped[0].error, LoadError::DuplicateName("lvl0_Starts".into()));
}

// =============================================================================
// Per-Count Expansion
// =============================================================================

/// Test that level_range expands into the schema's inclusive level range.
#[test]
fn test_level_range_expansion() {
    let schema = GameSchema::new("TEST").with_levels(1, 3).with_per_count_feature(
        "Starts",
        count_event("begin_level").with_count(Count::LevelRange).with_prefix("lvl"),
    );

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    assert_eq!(
        registry.extractor_names(),
        vec!["lvl1_Starts", "lvl2_Starts", "lvl3_Starts"]
    );

    registry
        .extract_from_event(&event("begin_level", 1).with_data("level", 3))
        .unwrap();
    registry
        .extract_from_event(&event("begin_level", 2).with_state("level", 3))
        .unwrap();
    assert_eq!(registry.get_feature_values(), vec![json!(0), json!(0), json!(2)]);
}

/// Test that mapped filters resolve named tables supplied to the loader.
#[test]
fn test_mapped_filter_uses_loader_table() {
    let schema = GameSchema::new("TEST").with_per_count_feature(
        "JobStarts",
        count_event("start_job")
            .with_count(Count::Fixed(2))
            .with_prefix("job")
            .with_filter(CountFilterConfig::Mapped {
                key: "job_name".into(),
                table: "jobs".into(),
            }),
    );
    let jobs: MappingTable = Arc::new(
        [("dig".to_string(), 0), ("survey".to_string(), 1)]
            .into_iter()
            .collect::<FxHashMap<_, _>>(),
    );

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema, ExtractionMode::Session)
        .with_mapping("jobs", jobs)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    for job in ["survey", "survey", "dig", "unknown"] {
        registry
            .extract_from_event(&event("start_job", 1).with_data("job_name", job))
            .unwrap();
    }
    assert_eq!(registry.get_feature_values(), vec![json!(1), json!(2)]);
}

// =============================================================================
// Mode And Override Filtering
// =============================================================================

/// Test that entries disabled for a mode, or unavailable in it, are left out.
#[test]
fn test_mode_filtering() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature(
            "SessionOnly",
            count_event("x").with_enabled(Enabled::Modes(vec![ExtractionMode::Session])),
        )
        .with_aggregate_feature("Off", count_event("x").with_enabled(Enabled::Flag(false)))
        .with_aggregate_feature("Duration", ExtractorConfig::new("SessionDuration"))
        .with_aggregate_feature("Everywhere", count_event("x"));

    let mut registry = FeatureRegistry::new(ExtractionMode::Player);
    let report = loader(schema, ExtractionMode::Player)
        .load_to_feature_registry(&mut registry)
        .unwrap();

    assert_eq!(registry.extractor_names(), vec!["Everywhere"]);
    assert_eq!(report.unavailable, vec!["Duration"]);
    assert!(report.is_clean());
}

/// Test that overrides restrict loading to the named entries.
#[test]
fn test_overrides() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature("A", count_event("a"))
        .with_aggregate_feature("B", count_event("b"))
        .with_aggregate_feature("C", count_event("c"));

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema, ExtractionMode::Session)
        .with_overrides(vec!["C".into(), "A".into()])
        .load_to_feature_registry(&mut registry)
        .unwrap();

    // Schema order wins over override order.
    assert_eq!(registry.extractor_names(), vec!["A", "C"]);
}

/// Test that detectors load only into detector registries.
#[test]
fn test_detectors_and_features_are_separate() {
    let schema = GameSchema::new("TEST")
        .with_aggregate_feature("Clicks", count_event("click"))
        .with_aggregate_detector(
            "Idle",
            ExtractorConfig::new("IdleGap").with_arg("idle_seconds", 30),
        );

    let mut features = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema.clone(), ExtractionMode::Session)
        .load_to_feature_registry(&mut features)
        .unwrap();
    let mut detectors = DetectorRegistry::new(ExtractionMode::Detector);
    loader(schema, ExtractionMode::Detector)
        .load_to_detector_registry(&mut detectors)
        .unwrap();

    assert_eq!(features.extractor_names(), vec!["Clicks"]);
    assert_eq!(detectors.extractor_names(), vec!["Idle"]);
}

/// Test loading straight from a JSON schema document.
#[test]
fn test_load_from_json_schema() {
    let schema: GameSchema = serde_json::from_value(json!({
        "game_name": "TEST",
        "min_level": 0,
        "max_level": 1,
        "aggregate_features": {
            "Clicks": { "type": "CountEvent", "target_event": "click" }
        },
        "per_count_features": {
            "Starts": {
                "type": "CountEvent",
                "count": "LEVEL_RANGE",
                "prefix": "lvl",
                "target_event": "begin_level"
            }
        }
    }))
    .unwrap();

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();
    assert_eq!(
        registry.extractor_names(),
        vec!["Clicks", "lvl0_Starts", "lvl1_Starts"]
    );
}

/// Test a stopwatch loaded from JSON, with its optional event lists.
#[test]
fn test_stopwatch_from_json_schema() {
    let schema: GameSchema = serde_json::from_value(json!({
        "game_name": "TEST",
        "aggregate_features": {
            "PuzzleTime": {
                "type": "StopwatchTimer",
                "start_event": "puzzle_start",
                "end_event": "puzzle_end",
                "ignore_events": ["menu_open"]
            }
        }
    }))
    .unwrap();

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    loader(schema, ExtractionMode::Session)
        .load_to_feature_registry(&mut registry)
        .unwrap();
    assert_eq!(registry.extractor_names(), vec!["PuzzleTime", "PuzzleTime-Seconds"]);

    for (name, secs) in [("puzzle_start", 0), ("move", 30), ("menu_open", 600), ("puzzle_end", 610)] {
        registry
            .extract_from_event(&event(name, secs).with_log_version("1"))
            .unwrap();
    }
    assert_eq!(registry.get_feature_values(), vec![json!("0:00:40"), json!(40.0)]);
}

// =============================================================================
// Per-Unit Shared State
// =============================================================================

/// Per-level click counter that also reads a family-wide tally.
struct SharedClicks {
    own: u64,
    family: Arc<Mutex<u64>>,
}

impl Feature for SharedClicks {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec!["click".into()]
    }

    fn update_from_event(&mut self, _event: &Event) {
        self.own += 1;
        if let Ok(mut family) = self.family.lock() {
            *family += 1;
        }
    }

    fn compute(&self) -> Vec<FeatureValue> {
        let family = self.family.lock().map(|f| *f).unwrap_or_default();
        vec![json!(self.own), json!(family)]
    }

    fn subfeatures(&self) -> Vec<String> {
        vec!["Family".into()]
    }
}

/// Test that a family shares one tracker per unit and a new unit starts
/// from a fresh one.
#[test]
fn test_shared_tracker_is_scoped_to_unit() {
    let schema = Arc::new(GameSchema::new("TEST").with_per_count_feature(
        "Clicks",
        ExtractorConfig::new("SharedClicks")
            .with_count(Count::Fixed(2))
            .with_prefix("lvl"),
    ));
    let catalog = Arc::new(ExtractorCatalog::new().with_feature("SharedClicks", |args| {
        Ok(Box::new(SharedClicks {
            own: 0,
            family: args.scope.shared::<u64>("clicks"),
        }) as Box<dyn Feature>)
    }));
    let first_unit = ExtractorLoader::new(schema, catalog, ExtractionMode::Session);

    let mut registry = FeatureRegistry::new(ExtractionMode::Session);
    first_unit.load_to_feature_registry(&mut registry).unwrap();
    registry
        .extract_from_event(&event("click", 1).with_data("level", 0))
        .unwrap();
    registry
        .extract_from_event(&event("click", 2).with_data("level", 1))
        .unwrap();
    registry
        .extract_from_event(&event("click", 3).with_data("level", 1))
        .unwrap();
    assert_eq!(
        registry.get_feature_values(),
        vec![json!(1), json!(3), json!(2), json!(3)]
    );
    assert_eq!(first_unit.scope().len(), 1);

    let second_unit = first_unit.for_new_unit();
    let mut next = FeatureRegistry::new(ExtractionMode::Session);
    second_unit.load_to_feature_registry(&mut next).unwrap();
    next.extract_from_event(&event("click", 4).with_data("level", 0))
        .unwrap();
    assert_eq!(next.get_feature_values(), vec![json!(1), json!(1), json!(0), json!(1)]);
}
