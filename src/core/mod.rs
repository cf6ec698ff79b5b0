//! Core data model: events, extraction modes, feature results.
//!
//! These types are shared by every other module and carry no routing
//! logic of their own.

pub mod event;
pub mod feature_data;
pub mod mode;

pub use event::{Event, EventSource, Payload};
pub use feature_data::{render_value, FeatureData, FeatureValue};
pub use mode::{ExtractionMode, IterationMode};
