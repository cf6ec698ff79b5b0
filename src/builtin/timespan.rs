use chrono::{DateTime, Utc};
use log::warn;
use serde_json::json;

use crate::core::{Event, ExtractionMode, FeatureValue};
use crate::error::LoadError;
use crate::extractors::Feature;
use crate::loader::FactoryArgs;

use super::seconds_between;

/// Seconds from the first `start_event` to the last `end_event`.
///
/// Repeated starts keep the first one; repeated ends keep the latest. An
/// end with no start is ignored. Reports 0 until both have been seen.
#[derive(Clone, Debug)]
pub struct Timespan {
    name: String,
    start_event: String,
    end_event: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl Timespan {
    pub fn new(name: impl Into<String>, start_event: impl Into<String>, end_event: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_event: start_event.into(),
            end_event: end_event.into(),
            start: None,
            end: None,
        }
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        Ok(Self::new(
            args.params.name.clone(),
            args.str_arg("start_event")?,
            args.str_arg("end_event")?,
        ))
    }
}

impl Feature for Timespan {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![self.start_event.clone(), self.end_event.clone()]
    }

    fn update_from_event(&mut self, event: &Event) {
        if event.event_name == self.start_event {
            match self.start {
                Some(start) => warn!(
                    "{} got a second {} event, {}s after the first",
                    self.name,
                    self.start_event,
                    seconds_between(start, event.timestamp)
                ),
                None => self.start = Some(event.timestamp),
            }
        } else if event.event_name == self.end_event {
            if self.start.is_none() {
                warn!(
                    "{} got a {} event before any {} event",
                    self.name, self.end_event, self.start_event
                );
                return;
            }
            if self.end.is_some() {
                warn!("{} got a second {} event, using the later one", self.name, self.end_event);
            }
            self.end = Some(event.timestamp);
        }
    }

    fn compute(&self) -> Vec<FeatureValue> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => vec![json!(seconds_between(start, end))],
            _ => vec![json!(0)],
        }
    }
}
