//! Builds extractor instances from a schema and fills registries.

use std::sync::Arc;

use log::{debug, error, info};
use rustc_hash::FxHashMap;

use crate::core::{ExtractionMode, IterationMode};
use crate::error::{LoadError, RegistryError, Result};
use crate::extractors::{
    CountFilter, CountPredicate, DetectorInstance, Extractor, ExtractorParameters, FeatureInstance,
    MappingTable,
};
use crate::registry::{DetectorRegistry, ExtractorRegistry, FeatureRegistry};
use crate::schema::{Count, CountFilterConfig, ExtractorConfig, ExtractorMap, GameSchema};

use super::catalog::{ExtractorCatalog, FactoryArgs};
use super::scope::UnitScope;

#[derive(Clone, Copy, Debug)]
enum Kind {
    Feature,
    Detector,
}

impl Kind {
    fn entries(self, schema: &GameSchema, iter_mode: IterationMode) -> &ExtractorMap {
        match self {
            Kind::Feature => schema.features(iter_mode),
            Kind::Detector => schema.detectors(iter_mode),
        }
    }

    fn enabled(
        self,
        schema: &GameSchema,
        name: &str,
        iter_mode: IterationMode,
        mode: ExtractionMode,
        overrides: Option<&[String]>,
    ) -> bool {
        match self {
            Kind::Feature => schema.feature_enabled(name, iter_mode, mode, overrides),
            Kind::Detector => schema.detector_enabled(name, iter_mode, mode, overrides),
        }
    }
}

impl Kind {
    /// Fail once per schema entry rather than once per instance.
    fn check_type(self, catalog: &ExtractorCatalog, type_name: &str) -> Result<(), LoadError> {
        let known = match self {
            Kind::Feature => catalog.has_feature(type_name),
            Kind::Detector => catalog.has_detector(type_name),
        };
        if known {
            Ok(())
        } else {
            Err(LoadError::UnknownExtractorType {
                kind: self.label(),
                extractor_type: type_name.to_string(),
            })
        }
    }

    fn label(self) -> &'static str {
        match self {
            Kind::Feature => "feature",
            Kind::Detector => "detector",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A schema entry or instance that was not loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedExtractor {
    pub name: String,
    pub error: LoadError,
}

/// Outcome of filling one registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Registered instance names.
    pub loaded: Vec<String>,
    /// Entries or instances that failed to build.
    pub skipped: Vec<SkippedExtractor>,
    /// Instances built but not available in the loader's mode.
    pub unavailable: Vec<String>,
}

impl LoadReport {
    /// True when nothing was skipped for an error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Factory for the extractors of one extraction unit.
///
/// Holds the schema, the game's catalog, the mode it builds for and the
/// lookups per-count filters refer to by name. Each loader owns a fresh
/// [`UnitScope`], so build one loader per unit.
#[derive(Clone)]
pub struct ExtractorLoader {
    schema: Arc<GameSchema>,
    catalog: Arc<ExtractorCatalog>,
    mode: ExtractionMode,
    overrides: Option<Vec<String>>,
    mappings: FxHashMap<String, MappingTable>,
    predicates: FxHashMap<String, CountPredicate>,
    scope: UnitScope,
}

impl ExtractorLoader {
    pub fn new(schema: Arc<GameSchema>, catalog: Arc<ExtractorCatalog>, mode: ExtractionMode) -> Self {
        Self {
            schema,
            catalog,
            mode,
            overrides: None,
            mappings: FxHashMap::default(),
            predicates: FxHashMap::default(),
            scope: UnitScope::new(),
        }
    }

    /// Only load extractors named in `overrides` (builder pattern).
    #[must_use]
    pub fn with_overrides(mut self, overrides: Vec<String>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Supply a mapping table for `mapped`/`user` filters (builder pattern).
    #[must_use]
    pub fn with_mapping(mut self, name: impl Into<String>, table: MappingTable) -> Self {
        self.mappings.insert(name.into(), table);
        self
    }

    /// Supply a predicate for `named` filters (builder pattern).
    #[must_use]
    pub fn with_count_filter(mut self, name: impl Into<String>, predicate: CountPredicate) -> Self {
        self.predicates.insert(name.into(), predicate);
        self
    }

    #[must_use]
    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    #[must_use]
    pub fn schema(&self) -> &GameSchema {
        &self.schema
    }

    /// Shared state of this unit.
    #[must_use]
    pub fn scope(&self) -> &UnitScope {
        &self.scope
    }

    /// Copy of this loader for another unit: same configuration, fresh scope.
    #[must_use]
    pub fn for_new_unit(&self) -> Self {
        Self {
            scope: UnitScope::new(),
            ..self.clone()
        }
    }

    /// Build one feature instance.
    ///
    /// `name` is the instance name (already prefixed for per-count
    /// instances) and `count_index` is `None` for aggregates.
    pub fn load_feature(
        &self,
        feature_type: &str,
        name: &str,
        config: &ExtractorConfig,
        count_index: Option<u32>,
    ) -> Result<FeatureInstance, LoadError> {
        let params = self.params(name, config, count_index);
        let filter = self.count_filter(config, count_index)?;
        let feature = self.catalog.make_feature(
            feature_type,
            &FactoryArgs {
                params: &params,
                config,
                scope: &self.scope,
            },
        )?;
        Ok(FeatureInstance::new(params, feature_type, filter, feature))
    }

    /// Build one detector instance.
    pub fn load_detector(
        &self,
        detector_type: &str,
        name: &str,
        config: &ExtractorConfig,
        count_index: Option<u32>,
    ) -> Result<DetectorInstance, LoadError> {
        let params = self.params(name, config, count_index);
        let filter = self.count_filter(config, count_index)?;
        let detector = self.catalog.make_detector(
            detector_type,
            &FactoryArgs {
                params: &params,
                config,
                scope: &self.scope,
            },
        )?;
        Ok(DetectorInstance::new(params, detector_type, filter, detector))
    }

    /// Register every enabled feature of the schema.
    ///
    /// Bad entries and name clashes are logged and skipped. Other registry
    /// errors abort.
    pub fn load_to_feature_registry(&self, registry: &mut FeatureRegistry) -> Result<LoadReport> {
        self.load_into(registry, Kind::Feature)
    }

    /// Register every enabled detector of the schema.
    pub fn load_to_detector_registry(&self, registry: &mut DetectorRegistry) -> Result<LoadReport> {
        self.load_into(registry, Kind::Detector)
    }

    /// Count indices a per-count entry expands into.
    pub fn count_range(&self, entry_name: &str, config: &ExtractorConfig) -> Result<Vec<u32>, LoadError> {
        match config.count {
            Some(Count::Fixed(n)) => Ok((0..n).collect()),
            Some(Count::LevelRange) => self
                .schema
                .level_range()
                .map(|range| range.collect())
                .ok_or_else(|| LoadError::InvalidSchemaField {
                    name: entry_name.to_string(),
                    field: "count".into(),
                    reason: "level_range needs min_level <= max_level in the schema".into(),
                }),
            None => Err(LoadError::MissingSchemaField {
                name: entry_name.to_string(),
                field: "count".into(),
            }),
        }
    }

    fn load_into<R: ExtractorRegistry>(&self, registry: &mut R, kind: Kind) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for iter_mode in [IterationMode::Aggregate, IterationMode::PerCount] {
            for (base_name, config) in kind.entries(&self.schema, iter_mode) {
                if !kind.enabled(&self.schema, base_name, iter_mode, self.mode, self.overrides.as_deref()) {
                    continue;
                }
                let type_name = config.type_name(base_name);

                let instances = kind
                    .check_type(&self.catalog, type_name)
                    .and_then(|()| self.instances(base_name, config, iter_mode));
                let instances = match instances {
                    Ok(instances) => instances,
                    Err(err) => {
                        error!("Skipping {kind} {base_name}: {err}");
                        report.skipped.push(SkippedExtractor {
                            name: base_name.clone(),
                            error: err,
                        });
                        continue;
                    }
                };

                for (name, index) in instances {
                    match self.build(kind, type_name, &name, config, index) {
                        Ok(extractor) if !extractor.available_modes().contains(&self.mode) => {
                            debug!("{kind} {name} is not available in {} mode", self.mode);
                            report.unavailable.push(name);
                        }
                        Ok(extractor) => match registry.register(extractor, iter_mode) {
                            Ok(()) => report.loaded.push(name),
                            Err(RegistryError::DuplicateExtractor(_)) => {
                                let err = LoadError::DuplicateName(name.clone());
                                error!("Skipping {kind} {name}: {err}");
                                report.skipped.push(SkippedExtractor { name, error: err });
                            }
                            Err(err) => return Err(err),
                        },
                        Err(err) => {
                            error!("Skipping {kind} {name}: {err}");
                            report.skipped.push(SkippedExtractor { name, error: err });
                        }
                    }
                }
            }
        }

        info!(
            "Loaded {} {kind} instance(s) for {} mode, skipped {}",
            report.loaded.len(),
            self.mode,
            report.skipped.len()
        );
        Ok(report)
    }

    fn build(
        &self,
        kind: Kind,
        type_name: &str,
        name: &str,
        config: &ExtractorConfig,
        count_index: Option<u32>,
    ) -> Result<Extractor, LoadError> {
        match kind {
            Kind::Feature => self
                .load_feature(type_name, name, config, count_index)
                .map(Extractor::from),
            Kind::Detector => self
                .load_detector(type_name, name, config, count_index)
                .map(Extractor::from),
        }
    }

    /// Instance names and indices for one schema entry.
    fn instances(
        &self,
        base_name: &str,
        config: &ExtractorConfig,
        iter_mode: IterationMode,
    ) -> Result<Vec<(String, Option<u32>)>, LoadError> {
        match iter_mode {
            IterationMode::Aggregate => Ok(vec![(base_name.to_string(), None)]),
            IterationMode::PerCount => {
                let prefix = config
                    .prefix
                    .as_deref()
                    .ok_or_else(|| LoadError::MissingSchemaField {
                        name: base_name.to_string(),
                        field: "prefix".into(),
                    })?;
                Ok(self
                    .count_range(base_name, config)?
                    .into_iter()
                    .map(|i| (format!("{prefix}{i}_{base_name}"), Some(i)))
                    .collect())
            }
        }
    }

    fn params(&self, name: &str, config: &ExtractorConfig, count_index: Option<u32>) -> ExtractorParameters {
        let params = ExtractorParameters::new(name, self.mode).with_description(config.description.clone());
        match count_index {
            Some(index) => params.with_count_index(index),
            None => params,
        }
    }

    fn count_filter(&self, config: &ExtractorConfig, count_index: Option<u32>) -> Result<CountFilter, LoadError> {
        if count_index.is_none() {
            return Ok(CountFilter::Aggregate);
        }
        match config.per.clone().unwrap_or_default() {
            CountFilterConfig::Level { key } => Ok(CountFilter::Level { key }),
            CountFilterConfig::Mapped { key, table } => {
                let table = self.mapping(&table)?;
                Ok(CountFilter::Mapped { key, table })
            }
            CountFilterConfig::User { table } => {
                let table = self.mapping(&table)?;
                Ok(CountFilter::User { table })
            }
            CountFilterConfig::Named { name } => self
                .predicates
                .get(&name)
                .cloned()
                .map(CountFilter::Custom)
                .ok_or(LoadError::UnknownCountFilter(name)),
        }
    }

    fn mapping(&self, name: &str) -> Result<MappingTable, LoadError> {
        self.mappings
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownMapping(name.to_string()))
    }
}

impl std::fmt::Debug for ExtractorLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut predicates: Vec<&String> = self.predicates.keys().collect();
        predicates.sort();
        f.debug_struct("ExtractorLoader")
            .field("game", &self.schema.game_name)
            .field("mode", &self.mode)
            .field("overrides", &self.overrides)
            .field("mappings", &self.mappings.len())
            .field("predicates", &predicates)
            .field("scope", &self.scope)
            .finish()
    }
}
