//! Registration table from type names to extractor factories.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::LoadError;
use crate::extractors::{Detector, ExtractorParameters, Feature};
use crate::schema::ExtractorConfig;

use super::scope::UnitScope;

/// Everything a factory gets to build one instance.
pub struct FactoryArgs<'a> {
    pub params: &'a ExtractorParameters,
    pub config: &'a ExtractorConfig,
    pub scope: &'a UnitScope,
}

/// Builds a feature computation from schema arguments.
pub type FeatureFactory =
    Arc<dyn Fn(&FactoryArgs<'_>) -> Result<Box<dyn Feature>, LoadError> + Send + Sync>;

/// Builds a detector computation from schema arguments.
pub type DetectorFactory =
    Arc<dyn Fn(&FactoryArgs<'_>) -> Result<Box<dyn Detector>, LoadError> + Send + Sync>;

impl FactoryArgs<'_> {
    /// Raw argument.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.config.args.get(key)
    }

    /// Required string argument.
    pub fn str_arg(&self, key: &str) -> Result<String, LoadError> {
        match self.arg(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.invalid(key, format!("expected a string, got {other}"))),
            None => Err(self.missing(key)),
        }
    }

    /// Optional string argument with a default.
    pub fn str_arg_or(&self, key: &str, default: &str) -> Result<String, LoadError> {
        match self.arg(key) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(_) => self.str_arg(key),
        }
    }

    /// Required non-negative integer argument.
    pub fn u64_arg(&self, key: &str) -> Result<u64, LoadError> {
        match self.arg(key) {
            Some(value) => value
                .as_u64()
                .ok_or_else(|| self.invalid(key, format!("expected a non-negative integer, got {value}"))),
            None => Err(self.missing(key)),
        }
    }

    /// Required number argument.
    pub fn f64_arg(&self, key: &str) -> Result<f64, LoadError> {
        match self.arg(key) {
            Some(value) => value
                .as_f64()
                .ok_or_else(|| self.invalid(key, format!("expected a number, got {value}"))),
            None => Err(self.missing(key)),
        }
    }

    /// Required non-empty list of strings.
    pub fn string_list_arg(&self, key: &str) -> Result<Vec<String>, LoadError> {
        let Some(value) = self.arg(key) else {
            return Err(self.missing(key));
        };
        let items = self.strings(key, value)?;
        if items.is_empty() {
            return Err(self.invalid(key, "list is empty".to_string()));
        }
        Ok(items)
    }

    /// Optional list of strings, empty when absent.
    pub fn string_list_arg_or_empty(&self, key: &str) -> Result<Vec<String>, LoadError> {
        match self.arg(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => self.strings(key, value),
        }
    }

    fn strings(&self, key: &str, value: &Value) -> Result<Vec<String>, LoadError> {
        value
            .as_array()
            .ok_or_else(|| self.invalid(key, format!("expected a list, got {value}")))?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.invalid(key, "expected only strings".to_string()))
    }

    fn missing(&self, key: &str) -> LoadError {
        LoadError::MissingSchemaField {
            name: self.params.name.clone(),
            field: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> LoadError {
        LoadError::InvalidSchemaField {
            name: self.params.name.clone(),
            field: key.to_string(),
            reason,
        }
    }
}

/// Factories keyed by the `type` string used in schemas.
///
/// Built once per game. Adding an extractor type is one `with_*` call.
#[derive(Clone, Default)]
pub struct ExtractorCatalog {
    features: FxHashMap<String, FeatureFactory>,
    detectors: FxHashMap<String, DetectorFactory>,
}

impl ExtractorCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with the built-in extractors.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        crate::builtin::register_builtins(&mut catalog);
        catalog
    }

    /// Add a feature type (builder pattern).
    #[must_use]
    pub fn with_feature<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Feature>, LoadError> + Send + Sync + 'static,
    {
        self.register_feature(type_name, factory);
        self
    }

    /// Add a detector type (builder pattern).
    #[must_use]
    pub fn with_detector<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Detector>, LoadError> + Send + Sync + 'static,
    {
        self.register_detector(type_name, factory);
        self
    }

    /// Add or replace a feature type.
    pub fn register_feature<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Feature>, LoadError> + Send + Sync + 'static,
    {
        self.features.insert(type_name.into(), Arc::new(factory));
    }

    /// Add or replace a detector type.
    pub fn register_detector<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&FactoryArgs<'_>) -> Result<Box<dyn Detector>, LoadError> + Send + Sync + 'static,
    {
        self.detectors.insert(type_name.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn has_feature(&self, type_name: &str) -> bool {
        self.features.contains_key(type_name)
    }

    #[must_use]
    pub fn has_detector(&self, type_name: &str) -> bool {
        self.detectors.contains_key(type_name)
    }

    /// Build a feature computation. Unknown types are an error.
    pub fn make_feature(&self, type_name: &str, args: &FactoryArgs<'_>) -> Result<Box<dyn Feature>, LoadError> {
        let factory = self
            .features
            .get(type_name)
            .ok_or_else(|| LoadError::UnknownExtractorType {
                kind: "feature",
                extractor_type: type_name.to_string(),
            })?;
        factory(args)
    }

    /// Build a detector computation. Unknown types are an error.
    pub fn make_detector(&self, type_name: &str, args: &FactoryArgs<'_>) -> Result<Box<dyn Detector>, LoadError> {
        let factory = self
            .detectors
            .get(type_name)
            .ok_or_else(|| LoadError::UnknownExtractorType {
                kind: "detector",
                extractor_type: type_name.to_string(),
            })?;
        factory(args)
    }

    /// Registered feature type names, sorted.
    #[must_use]
    pub fn feature_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.features.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered detector type names, sorted.
    #[must_use]
    pub fn detector_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.detectors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ExtractorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorCatalog")
            .field("features", &self.feature_types())
            .field("detectors", &self.detector_types())
            .finish()
    }
}
