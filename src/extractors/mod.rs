//! Extractor contracts and the instance wrappers the registries dispatch to.

mod detector;
mod extractor;
mod feature;
mod filter;
mod params;

pub use detector::{Detector, DetectorInstance};
pub use extractor::{Extractor, ALL_EVENTS};
pub use feature::{Feature, FeatureInstance};
pub use filter::{CountFilter, CountPredicate, MappingTable};
pub use params::ExtractorParameters;

