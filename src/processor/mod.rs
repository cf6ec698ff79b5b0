//! Processors: per-unit owners of a loader and a registry.
//!
//! A `FeatureProcessor` produces one row per session, player or
//! population. A `DetectorProcessor` turns logged events into synthetic
//! ones. `SessionPipeline` wires the two together for a single session.

mod config;
mod detector_processor;
mod feature_processor;
mod pipeline;

pub use config::{ProcessorConfig, DEFAULT_MAX_SYNTHETIC_EVENTS};
pub use detector_processor::DetectorProcessor;
pub use feature_processor::FeatureProcessor;
pub use pipeline::SessionPipeline;
