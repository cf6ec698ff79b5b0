//! Shared extractor contract: identity, event filter, version filter.
//!
//! Features and detectors are registered through the `Extractor` enum so a
//! registry can reject the wrong kind at run time.

use std::cmp::Ordering;

use crate::core::{Event, ExtractionMode};

use super::detector::DetectorInstance;
use super::feature::FeatureInstance;
use super::params::ExtractorParameters;

/// Reserved event dependency: receive every event regardless of name.
pub const ALL_EVENTS: &str = "all_events";

/// Any registrable extractor instance.
#[derive(Debug)]
pub enum Extractor {
    /// Accumulates events/features into output columns.
    Feature(FeatureInstance),
    /// Accumulates events and emits synthetic events.
    Detector(DetectorInstance),
}

impl Extractor {
    /// Instance parameters.
    #[must_use]
    pub fn params(&self) -> &ExtractorParameters {
        match self {
            Extractor::Feature(f) => f.params(),
            Extractor::Detector(d) => d.params(),
        }
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.params().name
    }

    /// Count index, `None` for aggregates.
    #[must_use]
    pub fn count_index(&self) -> Option<u32> {
        self.params().count_index
    }

    /// Mode the instance was built for.
    #[must_use]
    pub fn mode(&self) -> ExtractionMode {
        self.params().mode
    }

    /// Event names the instance must receive.
    #[must_use]
    pub fn event_dependencies(&self) -> &[String] {
        match self {
            Extractor::Feature(f) => f.event_dependencies(),
            Extractor::Detector(d) => d.event_dependencies(),
        }
    }

    /// Modes the instance supports.
    #[must_use]
    pub fn available_modes(&self) -> &'static [ExtractionMode] {
        match self {
            Extractor::Feature(f) => f.available_modes(),
            Extractor::Detector(_) => ExtractionMode::DETECTOR_MODES,
        }
    }

    /// "feature" or "detector", for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Extractor::Feature(_) => "feature",
            Extractor::Detector(_) => "detector",
        }
    }
}

impl From<FeatureInstance> for Extractor {
    fn from(feature: FeatureInstance) -> Self {
        Extractor::Feature(feature)
    }
}

impl From<DetectorInstance> for Extractor {
    fn from(detector: DetectorInstance) -> Self {
        Extractor::Detector(detector)
    }
}

/// Check a log version against optional `[min, max]` bounds.
///
/// With no bounds every event passes, including ones without a version.
/// With any bound set, an event without a version is rejected.
pub(crate) fn version_in_range(
    log_version: Option<&str>,
    min: Option<&str>,
    max: Option<&str>,
) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(version) = log_version else {
        return false;
    };
    if let Some(min) = min {
        if Event::compare_versions(version, min) == Ordering::Less {
            return false;
        }
    }
    if let Some(max) = max {
        if Event::compare_versions(version, max) == Ordering::Greater {
            return false;
        }
    }
    true
}

/// Check an event name against declared dependencies.
pub(crate) fn wants_event(dependencies: &[String], event_name: &str) -> bool {
    dependencies
        .iter()
        .any(|dep| dep == event_name || dep == ALL_EVENTS)
}
