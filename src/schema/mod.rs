//! Parsed game schema: which extractors a game declares and how.
//!
//! The core never reads schema files itself. An outer layer deserializes a
//! `GameSchema` (or builds one in code) and hands it to the loader.
//!
//! ```json
//! {
//!   "game_name": "KELP",
//!   "min_level": 0,
//!   "max_level": 2,
//!   "aggregate_features": {
//!     "EventCount": { "type": "CountEvent", "target_event": "all_events" }
//!   },
//!   "per_count_features": {
//!     "LevelStarts": {
//!       "type": "CountEvent", "count": "level_range", "prefix": "lvl",
//!       "target_event": "begin_level"
//!     }
//!   }
//! }
//! ```

mod extractor_config;

pub use extractor_config::{Count, CountFilterConfig, Enabled, ExtractorConfig};

use std::ops::RangeInclusive;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{ExtractionMode, IterationMode};

/// Schema entries keyed by extractor name, in declaration order.
pub type ExtractorMap = IndexMap<String, ExtractorConfig>;

/// Everything a game declares about its extractors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSchema {
    pub game_name: String,

    pub aggregate_features: ExtractorMap,

    pub per_count_features: ExtractorMap,

    pub aggregate_detectors: ExtractorMap,

    pub per_count_detectors: ExtractorMap,

    /// Lowest level, for `count: "level_range"`.
    pub min_level: Option<u32>,

    /// Highest level (inclusive), for `count: "level_range"`.
    pub max_level: Option<u32>,
}

impl GameSchema {
    pub fn new(game_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            ..Self::default()
        }
    }

    /// Declare an aggregate feature (builder pattern).
    #[must_use]
    pub fn with_aggregate_feature(mut self, name: impl Into<String>, config: ExtractorConfig) -> Self {
        self.aggregate_features.insert(name.into(), config);
        self
    }

    /// Declare a per-count feature (builder pattern).
    #[must_use]
    pub fn with_per_count_feature(mut self, name: impl Into<String>, config: ExtractorConfig) -> Self {
        self.per_count_features.insert(name.into(), config);
        self
    }

    /// Declare an aggregate detector (builder pattern).
    #[must_use]
    pub fn with_aggregate_detector(mut self, name: impl Into<String>, config: ExtractorConfig) -> Self {
        self.aggregate_detectors.insert(name.into(), config);
        self
    }

    /// Declare a per-count detector (builder pattern).
    #[must_use]
    pub fn with_per_count_detector(mut self, name: impl Into<String>, config: ExtractorConfig) -> Self {
        self.per_count_detectors.insert(name.into(), config);
        self
    }

    /// Set the level bounds (builder pattern).
    #[must_use]
    pub fn with_levels(mut self, min_level: u32, max_level: u32) -> Self {
        self.min_level = Some(min_level);
        self.max_level = Some(max_level);
        self
    }

    /// Feature entries for one iteration mode.
    #[must_use]
    pub fn features(&self, iter_mode: IterationMode) -> &ExtractorMap {
        match iter_mode {
            IterationMode::Aggregate => &self.aggregate_features,
            IterationMode::PerCount => &self.per_count_features,
        }
    }

    /// Detector entries for one iteration mode.
    #[must_use]
    pub fn detectors(&self, iter_mode: IterationMode) -> &ExtractorMap {
        match iter_mode {
            IterationMode::Aggregate => &self.aggregate_detectors,
            IterationMode::PerCount => &self.per_count_detectors,
        }
    }

    /// Whether a feature should be loaded.
    ///
    /// The entry must exist and be enabled for `extract_mode`. When an
    /// override list is supplied, the name must also appear in it.
    #[must_use]
    pub fn feature_enabled(
        &self,
        name: &str,
        iter_mode: IterationMode,
        extract_mode: ExtractionMode,
        overrides: Option<&[String]>,
    ) -> bool {
        entry_enabled(self.features(iter_mode), name, iter_mode, extract_mode, overrides)
    }

    /// Whether a detector should be loaded. Same rules as features.
    #[must_use]
    pub fn detector_enabled(
        &self,
        name: &str,
        iter_mode: IterationMode,
        extract_mode: ExtractionMode,
        overrides: Option<&[String]>,
    ) -> bool {
        entry_enabled(self.detectors(iter_mode), name, iter_mode, extract_mode, overrides)
    }

    /// Inclusive level range, if both bounds are set and ordered.
    #[must_use]
    pub fn level_range(&self) -> Option<RangeInclusive<u32>> {
        match (self.min_level, self.max_level) {
            (Some(min), Some(max)) if min <= max => Some(min..=max),
            _ => None,
        }
    }
}

fn entry_enabled(
    entries: &ExtractorMap,
    name: &str,
    iter_mode: IterationMode,
    extract_mode: ExtractionMode,
    overrides: Option<&[String]>,
) -> bool {
    let Some(config) = entries.get(name) else {
        debug!("No {iter_mode} schema entry named {name}");
        return false;
    };
    if let Some(allowed) = overrides {
        if !allowed.iter().any(|o| o == name) {
            return false;
        }
    }
    config.enabled.includes(extract_mode)
}
