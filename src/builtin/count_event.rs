use serde_json::json;

use crate::core::{Event, ExtractionMode, FeatureValue};
use crate::error::LoadError;
use crate::extractors::Feature;
use crate::loader::FactoryArgs;

/// Number of `target_event` events; `all_events` counts everything.
#[derive(Clone, Debug)]
pub struct CountEvent {
    target_event: String,
    count: u64,
}

impl CountEvent {
    pub fn new(target_event: impl Into<String>) -> Self {
        Self {
            target_event: target_event.into(),
            count: 0,
        }
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        Ok(Self::new(args.str_arg("target_event")?))
    }
}

impl Feature for CountEvent {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![self.target_event.clone()]
    }

    fn update_from_event(&mut self, _event: &Event) {
        self.count += 1;
    }

    fn compute(&self) -> Vec<FeatureValue> {
        vec![json!(self.count)]
    }
}
