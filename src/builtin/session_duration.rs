use chrono::{DateTime, Utc};
use serde_json::json;

use crate::core::{Event, EventSource, ExtractionMode, FeatureValue};
use crate::extractors::{Feature, ALL_EVENTS};

use super::seconds_between;

/// Seconds between the first and last logged event of a session, with the
/// number of logged events as a subfeature. Detector output is ignored.
#[derive(Clone, Debug, Default)]
pub struct SessionDuration {
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
    events: u64,
}

impl SessionDuration {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Feature for SessionDuration {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![ALL_EVENTS.to_string()]
    }

    fn update_from_event(&mut self, event: &Event) {
        if event.event_source == EventSource::Generated {
            return;
        }
        self.first.get_or_insert(event.timestamp);
        self.last = Some(event.timestamp);
        self.events += 1;
    }

    fn compute(&self) -> Vec<FeatureValue> {
        let seconds = match (self.first, self.last) {
            (Some(first), Some(last)) => seconds_between(first, last),
            _ => 0.0,
        };
        vec![json!(seconds), json!(self.events)]
    }

    fn subfeatures(&self) -> Vec<String> {
        vec!["EventCount".into()]
    }

    fn available_modes(&self) -> &'static [ExtractionMode] {
        &[ExtractionMode::Session]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_duration_ignores_generated() {
        let mut duration = SessionDuration::new();
        let ts = |s| Utc.timestamp_opt(s, 0).single().unwrap();

        duration.update_from_event(&Event::new("s", "a", ts(100)));
        duration.update_from_event(&Event::new("s", "b", ts(130)));
        duration.update_from_event(&Event::new("s", "burst", ts(500)).generated());

        assert_eq!(duration.compute(), vec![json!(30.0), json!(2)]);
    }
}
