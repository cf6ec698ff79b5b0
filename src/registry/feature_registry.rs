//! Feature registry with first-order and second-order buckets.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::{render_value, Event, ExtractionMode, FeatureData, FeatureValue, IterationMode};
use crate::error::{RegistryError, Result};
use crate::extractors::{Extractor, FeatureInstance};

use super::routing::{EventRouter, ListenerTable};
use super::{ExtractionStage, ExtractorRegistry, Listener};

/// Which bucket a feature lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureOrder {
    /// Consumes events only.
    FirstOrder,
    /// Consumes other features' results (and possibly events).
    SecondOrder,
}

impl FeatureOrder {
    pub const ALL: [FeatureOrder; 2] = [FeatureOrder::FirstOrder, FeatureOrder::SecondOrder];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            FeatureOrder::FirstOrder => 0,
            FeatureOrder::SecondOrder => 1,
        }
    }
}

/// Registry of feature instances for one extraction unit.
///
/// Events are routed by name to first- and second-order features alike.
/// First-order results pushed through `extract_from_feature_data` reach
/// only the second-order features that declared them as dependencies.
#[derive(Debug)]
pub struct FeatureRegistry {
    mode: ExtractionMode,
    stage: ExtractionStage,
    first_order: IndexMap<String, FeatureInstance>,
    second_order: IndexMap<String, FeatureInstance>,
    events: EventRouter,
    features: ListenerTable,
}

impl FeatureRegistry {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            stage: ExtractionStage::Empty,
            first_order: IndexMap::new(),
            second_order: IndexMap::new(),
            events: EventRouter::default(),
            features: ListenerTable::default(),
        }
    }

    /// Route an event to every interested feature.
    ///
    /// Returns how many instances accepted it.
    pub fn extract_from_event(&mut self, event: &Event) -> Result<usize> {
        if self.stage >= ExtractionStage::FirstOrderFinalized {
            return Err(RegistryError::StageViolation {
                operation: "extract from event",
                stage: self.stage,
            });
        }
        self.enter(ExtractionStage::Streaming);

        let mut accepted = 0;
        for listener in self.events.listeners_for(&event.event_name) {
            let instance = self
                .first_order
                .get_mut(&listener.name)
                .or_else(|| self.second_order.get_mut(&listener.name));
            if let Some(instance) = instance {
                if instance.extract_from_event(event) {
                    accepted += 1;
                }
            }
        }
        Ok(accepted)
    }

    /// Route a first-order result to the second-order features that
    /// depend on it.
    ///
    /// Each column is routed under its own name, so dependents may name a
    /// suffixed base column or a subfeature column.
    ///
    /// Callers must only push results once the producing unit has seen all
    /// of its events. Returns how many instances accepted it.
    pub fn extract_from_feature_data(&mut self, data: &FeatureData) -> Result<usize> {
        if self.stage >= ExtractionStage::SecondOrderFinalized {
            return Err(RegistryError::StageViolation {
                operation: "extract from feature data",
                stage: self.stage,
            });
        }
        self.enter(ExtractionStage::Streaming);

        let mut accepted = 0;
        for record in data.split_columns() {
            for listener in self.features.get(&record.name) {
                if let Some(instance) = self.second_order.get_mut(&listener.name) {
                    if instance.extract_from_feature_data(&record) {
                        accepted += 1;
                    }
                }
            }
        }
        Ok(accepted)
    }

    /// Mark one bucket finalized without reading it.
    pub fn finalize(&mut self, order: FeatureOrder) {
        self.enter(match order {
            FeatureOrder::FirstOrder => ExtractionStage::FirstOrderFinalized,
            FeatureOrder::SecondOrder => ExtractionStage::SecondOrderFinalized,
        });
    }

    /// Read out one bucket as `FeatureData`, marking it finalized.
    pub fn get_feature_data(
        &mut self,
        order: FeatureOrder,
        player_id: Option<&str>,
        session_id: Option<&str>,
    ) -> Vec<FeatureData> {
        self.finalize(order);
        self.bucket_mut(order)
            .values_mut()
            .map(|feature| feature.to_feature_data(player_id, session_id))
            .collect()
    }

    /// Every output value, first order then second order, one per column.
    pub fn get_feature_values(&mut self) -> Vec<FeatureValue> {
        let mut values = Vec::new();
        for feature in self
            .first_order
            .values_mut()
            .chain(self.second_order.values_mut())
        {
            let next = feature.feature_values();
            if next.is_empty() {
                values.push(FeatureValue::Null);
            } else {
                values.extend_from_slice(next);
            }
        }
        values
    }

    /// Every output value rendered as text. Nulls render as `None`.
    pub fn get_feature_string_values(&mut self) -> Vec<String> {
        self.get_feature_values().iter().map(render_value).collect()
    }

    /// Number of feature orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        FeatureOrder::ALL.len()
    }

    /// First-order feature names some second-order feature asked for.
    #[must_use]
    pub fn first_orders_requested(&self) -> Vec<String> {
        let mut names: Vec<String> = self.features.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instances in one bucket, in registration order.
    pub fn features(&self, order: FeatureOrder) -> impl Iterator<Item = &FeatureInstance> {
        match order {
            FeatureOrder::FirstOrder => self.first_order.values(),
            FeatureOrder::SecondOrder => self.second_order.values(),
        }
    }

    /// Look up an instance by name in either bucket.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureInstance> {
        self.first_order
            .get(name)
            .or_else(|| self.second_order.get(name))
    }

    /// Mutable lookup, e.g. to read one feature's values.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FeatureInstance> {
        match self.first_order.get_mut(name) {
            Some(instance) => Some(instance),
            None => self.second_order.get_mut(name),
        }
    }

    /// Bucket holding `name`, if registered.
    #[must_use]
    pub fn order_of(&self, name: &str) -> Option<FeatureOrder> {
        if self.first_order.contains_key(name) {
            Some(FeatureOrder::FirstOrder)
        } else if self.second_order.contains_key(name) {
            Some(FeatureOrder::SecondOrder)
        } else {
            None
        }
    }

    /// Instance names, first order then second order.
    #[must_use]
    pub fn instance_names(&self) -> Vec<String> {
        self.first_order
            .keys()
            .chain(self.second_order.keys())
            .cloned()
            .collect()
    }

    /// Listeners that would receive an event named `event_name`.
    #[must_use]
    pub fn event_listeners(&self, event_name: &str) -> Vec<&Listener> {
        self.events.listeners_for(event_name).collect()
    }

    fn bucket_mut(&mut self, order: FeatureOrder) -> &mut IndexMap<String, FeatureInstance> {
        match order {
            FeatureOrder::FirstOrder => &mut self.first_order,
            FeatureOrder::SecondOrder => &mut self.second_order,
        }
    }

    fn enter(&mut self, stage: ExtractionStage) {
        if stage > self.stage {
            debug!("FeatureRegistry ({}) {} -> {}", self.mode, self.stage, stage);
            self.stage = stage;
        }
    }
}

impl ExtractorRegistry for FeatureRegistry {
    fn register(&mut self, extractor: Extractor, kind: IterationMode) -> Result<()> {
        let feature = match extractor {
            Extractor::Feature(feature) => feature,
            other => {
                return Err(RegistryError::TypeMismatch {
                    registry: "FeatureRegistry",
                    expected: "feature",
                    found: other.kind_name(),
                    name: other.name().to_string(),
                })
            }
        };
        if self.stage > ExtractionStage::Loaded {
            return Err(RegistryError::StageViolation {
                operation: "register",
                stage: self.stage,
            });
        }
        if self.order_of(feature.name()).is_some() {
            return Err(RegistryError::DuplicateExtractor(feature.name().to_string()));
        }

        let listener = Listener::new(feature.name(), kind);
        self.events.add(feature.event_dependencies(), &listener);
        self.features.add(feature.feature_dependencies(), &listener);

        let bucket = if feature.is_second_order() {
            &mut self.second_order
        } else {
            &mut self.first_order
        };
        bucket.insert(feature.name().to_string(), feature);
        self.enter(ExtractionStage::Loaded);
        Ok(())
    }

    fn extractor_names(&self) -> Vec<String> {
        self.first_order
            .values()
            .chain(self.second_order.values())
            .flat_map(|feature| feature.feature_names().iter().cloned())
            .collect()
    }

    fn mode(&self) -> ExtractionMode {
        self.mode
    }

    fn stage(&self) -> ExtractionStage {
        self.stage
    }

    fn len(&self) -> usize {
        self.first_order.len() + self.second_order.len()
    }

    fn clear(&mut self) {
        debug!("Clearing FeatureRegistry ({})", self.mode);
        self.first_order.clear();
        self.second_order.clear();
        self.events.clear();
        self.features.clear();
        self.stage = ExtractionStage::Empty;
    }
}

impl std::fmt::Display for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self
            .first_order
            .values()
            .chain(self.second_order.values())
            .map(ToString::to_string)
            .collect();
        f.write_str(&lines.join("\n"))
    }
}
