//! Extraction granularities and iteration kinds.

use serde::{Deserialize, Serialize};

/// The unit over which a registry accumulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMode {
    /// One session.
    Session,
    /// One player across sessions.
    #[serde(alias = "USER")]
    Player,
    /// Every player.
    Population,
    /// Detector extraction (synthetic event generation).
    Detector,
}

impl ExtractionMode {
    /// Modes a feature may run in.
    pub const FEATURE_MODES: &'static [ExtractionMode] = &[
        ExtractionMode::Population,
        ExtractionMode::Player,
        ExtractionMode::Session,
    ];

    /// Modes a detector may run in.
    pub const DETECTOR_MODES: &'static [ExtractionMode] = &[ExtractionMode::Detector];

    /// Upper-case name, as written in schemas.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExtractionMode::Session => "SESSION",
            ExtractionMode::Player => "PLAYER",
            ExtractionMode::Population => "POPULATION",
            ExtractionMode::Detector => "DETECTOR",
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an extractor is a single aggregate or one of a per-count family.
///
/// Recorded on listeners for diagnostics; dispatch itself is keyed by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IterationMode {
    /// One instance per unit.
    Aggregate,
    /// N instances, one per count index.
    #[serde(rename = "PERCOUNT")]
    PerCount,
}

impl std::fmt::Display for IterationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IterationMode::Aggregate => f.write_str("AGGREGATE"),
            IterationMode::PerCount => f.write_str("PERCOUNT"),
        }
    }
}
