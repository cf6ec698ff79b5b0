//! Extractor registries: dispatch tables from event/feature names to the
//! extractor instances that asked for them.
//!
//! ## Lifecycle
//!
//! One registry serves one extraction unit (a session, a player, the
//! population). It moves through [`ExtractionStage`]s:
//!
//! ```text
//! Empty -> Loaded -> Streaming -> FirstOrderFinalized -> SecondOrderFinalized
//! ```
//!
//! Operations that would go backwards return
//! [`RegistryError::StageViolation`](crate::RegistryError::StageViolation).
//! Reading values is allowed at every stage, it just yields whatever has
//! been accumulated so far. `clear` returns the registry to `Empty` for the
//! next unit.

mod detector_registry;
mod feature_registry;
mod routing;

pub use detector_registry::DetectorRegistry;
pub use feature_registry::{FeatureOrder, FeatureRegistry};

use serde::{Deserialize, Serialize};

use crate::core::{ExtractionMode, IterationMode};
use crate::error::Result;
use crate::extractors::Extractor;

/// Dispatch table entry: "instance `name` wants this event/feature".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub kind: IterationMode,
}

impl Listener {
    pub fn new(name: impl Into<String>, kind: IterationMode) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// Where a registry is in its per-unit lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExtractionStage {
    /// Nothing registered yet.
    #[default]
    Empty,
    /// Extractors registered, no input yet.
    Loaded,
    /// Events or feature data are flowing in.
    Streaming,
    /// First-order results have been read out.
    FirstOrderFinalized,
    /// Second-order results have been read out.
    SecondOrderFinalized,
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractionStage::Empty => "empty",
            ExtractionStage::Loaded => "loaded",
            ExtractionStage::Streaming => "streaming",
            ExtractionStage::FirstOrderFinalized => "first-order finalized",
            ExtractionStage::SecondOrderFinalized => "second-order finalized",
        };
        f.write_str(name)
    }
}

/// Operations shared by every registry.
///
/// The loader fills registries through this trait.
pub trait ExtractorRegistry {
    /// Add an extractor instance and index its dependencies.
    ///
    /// Fails if the extractor is the wrong kind for this registry, if its
    /// name is taken, or if streaming has already begun.
    fn register(&mut self, extractor: Extractor, kind: IterationMode) -> Result<()>;

    /// Expanded output names, in registration order.
    fn extractor_names(&self) -> Vec<String>;

    /// Extraction mode the registry was built for.
    fn mode(&self) -> ExtractionMode;

    /// Current lifecycle stage.
    fn stage(&self) -> ExtractionStage;

    /// Number of registered instances.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every instance and listener, back to `Empty`.
    fn clear(&mut self);
}
