use log::warn;
use serde_json::json;

use crate::core::{Event, ExtractionMode, FeatureData, FeatureValue};
use crate::error::LoadError;
use crate::extractors::Feature;
use crate::loader::FactoryArgs;

/// Second-order sum of the base value of each `sources` feature.
///
/// Every result received is added, so in player or population mode the
/// total spans all sessions pushed in. The `Count` subfeature is the
/// number of results summed.
#[derive(Clone, Debug)]
pub struct FeatureTotal {
    name: String,
    sources: Vec<String>,
    total: f64,
    count: u64,
}

impl FeatureTotal {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sources,
            total: 0.0,
            count: 0,
        }
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        Ok(Self::new(args.params.name.clone(), args.string_list_arg("sources")?))
    }
}

impl Feature for FeatureTotal {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        Vec::new()
    }

    fn feature_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        self.sources.clone()
    }

    fn update_from_event(&mut self, _event: &Event) {}

    fn update_from_feature_data(&mut self, data: &FeatureData) {
        match data.value().as_f64() {
            Some(value) => {
                self.total += value;
                self.count += 1;
            }
            None => warn!(
                "{} got non-numeric value {} from {}",
                self.name,
                data.value(),
                data.name
            ),
        }
    }

    fn compute(&self) -> Vec<FeatureValue> {
        vec![json!(self.total), json!(self.count)]
    }

    fn subfeatures(&self) -> Vec<String> {
        vec!["Count".into()]
    }
}
