use chrono::{DateTime, Utc};
use serde_json::json;

use crate::core::{Event, ExtractionMode};
use crate::error::LoadError;
use crate::extractors::Detector;
use crate::loader::FactoryArgs;

/// Emits `emit_event` after every `threshold` matching events.
///
/// The synthetic event copies the context of the event that crossed the
/// threshold and carries `count` (running total) in its data.
#[derive(Clone, Debug)]
pub struct CountThreshold {
    target_event: String,
    emit_event: String,
    threshold: u64,
    since_fire: u64,
    total: u64,
    last: Option<Event>,
}

impl CountThreshold {
    pub fn new(target_event: impl Into<String>, threshold: u64, emit_event: impl Into<String>) -> Self {
        Self {
            target_event: target_event.into(),
            emit_event: emit_event.into(),
            threshold: threshold.max(1),
            since_fire: 0,
            total: 0,
            last: None,
        }
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        let threshold = args.u64_arg("threshold")?;
        if threshold == 0 {
            return Err(LoadError::InvalidSchemaField {
                name: args.params.name.clone(),
                field: "threshold".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self::new(
            args.str_arg("target_event")?,
            threshold,
            args.str_arg("emit_event")?,
        ))
    }
}

impl Detector for CountThreshold {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![self.target_event.clone()]
    }

    fn update_from_event(&mut self, event: &Event) {
        self.since_fire += 1;
        self.total += 1;
        self.last = Some(event.clone());
    }

    fn trigger_condition(&self) -> bool {
        self.since_fire >= self.threshold && self.last.is_some()
    }

    fn trigger_event(&mut self) -> Event {
        self.since_fire = 0;
        match self.last.take() {
            Some(source) => source
                .synthesize(self.emit_event.clone())
                .with_data("count", self.total),
            // Unreachable while trigger_condition requires a source event.
            None => Event::new("", self.emit_event.clone(), DateTime::<Utc>::UNIX_EPOCH).generated(),
        }
    }
}
