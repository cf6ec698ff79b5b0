//! Per-instance extractor parameters.

use serde::{Deserialize, Serialize};

use crate::core::ExtractionMode;

/// Identity of one extractor instance.
///
/// Built fresh by the loader for every instance and owned by it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorParameters {
    /// Instance name; per-count instances carry their prefix, e.g. `lvl2_Score`.
    pub name: String,

    /// Free-text description from the schema.
    pub description: String,

    /// Mode of the registry the instance is built for.
    pub mode: ExtractionMode,

    /// `None` for aggregate instances, `0..N` for per-count instances.
    pub count_index: Option<u32>,
}

impl ExtractorParameters {
    /// Parameters for an aggregate instance.
    pub fn new(name: impl Into<String>, mode: ExtractionMode) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mode,
            count_index: None,
        }
    }

    /// Set the description (builder pattern).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Bind to a count index (builder pattern).
    #[must_use]
    pub fn with_count_index(mut self, index: u32) -> Self {
        self.count_index = Some(index);
        self
    }

    /// True for aggregate instances.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.count_index.is_none()
    }
}
