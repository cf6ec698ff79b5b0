//! # gameplay-features
//!
//! Streaming feature and detector extraction over timestamped gameplay
//! events.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: No hardcoded event names or features. Games
//!    describe what to extract in a `GameSchema` and supply extractor
//!    types through an `ExtractorCatalog`.
//!
//! 2. **Pay Only For Interest**: An event is delivered only to the
//!    instances that listed its name (or the `all_events` wildcard).
//!
//! 3. **Two Orders**: First-order features read events. Second-order
//!    features read finalized first-order results, from their own unit or
//!    from others.
//!
//! ## Architecture
//!
//! ```text
//! GameSchema + ExtractorCatalog
//!        |  ExtractorLoader (expands per-count families)
//!        v
//! FeatureRegistry / DetectorRegistry (event routing, stage tracking)
//!        |
//!        v
//! FeatureProcessor / DetectorProcessor / SessionPipeline
//! ```
//!
//! Detectors emit synthetic events that are fed back to detectors and
//! features in FIFO order, bounded per outer event.
//!
//! ## Modules
//!
//! - `core`: Events, extraction modes, feature results
//! - `extractors`: `Feature` and `Detector` traits, instances, count filters
//! - `schema`: Serde model of a game's extractor declarations
//! - `loader`: Catalog of extractor types and schema expansion
//! - `registry`: Event routing and two-order dispatch
//! - `processor`: Per-unit drivers
//! - `builtin`: Extractor types every game can use

pub mod builtin;
pub mod core;
pub mod error;
pub mod extractors;
pub mod loader;
pub mod processor;
pub mod registry;
pub mod schema;

// Re-export commonly used types
pub use crate::core::{
    render_value, Event, EventSource, ExtractionMode, FeatureData, FeatureValue, IterationMode,
    Payload,
};

pub use crate::error::{LoadError, RegistryError, Result};

pub use crate::extractors::{
    CountFilter, CountPredicate, Detector, DetectorInstance, Extractor, ExtractorParameters,
    Feature, FeatureInstance, MappingTable, ALL_EVENTS,
};

pub use crate::schema::{Count, CountFilterConfig, Enabled, ExtractorConfig, GameSchema};

pub use crate::loader::{
    ExtractorCatalog, ExtractorLoader, FactoryArgs, LoadReport, SkippedExtractor, UnitScope,
};

pub use crate::registry::{
    DetectorRegistry, ExtractionStage, ExtractorRegistry, FeatureOrder, FeatureRegistry, Listener,
};

pub use crate::processor::{DetectorProcessor, FeatureProcessor, ProcessorConfig, SessionPipeline};
