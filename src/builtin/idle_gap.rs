use chrono::{DateTime, Utc};

use crate::core::{Event, EventSource, ExtractionMode};
use crate::error::LoadError;
use crate::extractors::{Detector, ALL_EVENTS};
use crate::loader::FactoryArgs;

use super::seconds_between;

/// Emits `emit_event` when more than `idle_seconds` pass between two
/// consecutive logged events.
///
/// The synthetic event takes the context of the event that ended the gap
/// and carries `gap_seconds` in its data. Detector output is ignored.
#[derive(Clone, Debug)]
pub struct IdleGap {
    idle_seconds: f64,
    emit_event: String,
    previous: Option<DateTime<Utc>>,
    pending: Option<(Event, f64)>,
}

impl IdleGap {
    pub fn new(idle_seconds: f64, emit_event: impl Into<String>) -> Self {
        Self {
            idle_seconds,
            emit_event: emit_event.into(),
            previous: None,
            pending: None,
        }
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        let idle_seconds = args.f64_arg("idle_seconds")?;
        if idle_seconds.is_nan() || idle_seconds <= 0.0 {
            return Err(LoadError::InvalidSchemaField {
                name: args.params.name.clone(),
                field: "idle_seconds".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(Self::new(idle_seconds, args.str_arg_or("emit_event", "idle")?))
    }
}

impl Detector for IdleGap {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![ALL_EVENTS.to_string()]
    }

    fn update_from_event(&mut self, event: &Event) {
        if event.event_source == EventSource::Generated {
            return;
        }
        if let Some(previous) = self.previous {
            let gap = seconds_between(previous, event.timestamp);
            if gap > self.idle_seconds {
                self.pending = Some((event.clone(), gap));
            }
        }
        self.previous = Some(event.timestamp);
    }

    fn trigger_condition(&self) -> bool {
        self.pending.is_some()
    }

    fn trigger_event(&mut self) -> Event {
        match self.pending.take() {
            Some((source, gap)) => source
                .synthesize(self.emit_event.clone())
                .with_data("gap_seconds", gap),
            None => Event::new("", self.emit_event.clone(), DateTime::<Utc>::UNIX_EPOCH).generated(),
        }
    }
}
