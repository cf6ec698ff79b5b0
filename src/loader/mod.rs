//! Turning schema entries into registered extractor instances.
//!
//! - `ExtractorCatalog`: type name -> factory, built once per game
//! - `ExtractorLoader`: expands schema entries (per-count families included)
//!   and registers the instances
//! - `UnitScope`: state shared by the instances of one extraction unit

mod catalog;
mod extractor_loader;
mod scope;

pub use catalog::{DetectorFactory, ExtractorCatalog, FactoryArgs, FeatureFactory};
pub use extractor_loader::{ExtractorLoader, LoadReport, SkippedExtractor};
pub use scope::UnitScope;
