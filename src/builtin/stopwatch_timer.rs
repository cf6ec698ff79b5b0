use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::core::{Event, EventSource, ExtractionMode, FeatureValue};
use crate::error::LoadError;
use crate::extractors::{Feature, ALL_EVENTS};
use crate::loader::FactoryArgs;

/// Time spent between `start_event` and `end_event`, summed over every
/// start/end pair.
///
/// While running, each logged event adds the gap since the previous
/// logged event. An `ignore_events` event adds nothing for the gap that
/// ends at it. A `reset_events` event does the same and also stops the
/// stopwatch. The base column is the total as `H:MM:SS`, the `Seconds`
/// subfeature the same total in seconds.
#[derive(Clone, Debug)]
pub struct StopwatchTimer {
    start_event: String,
    end_event: String,
    ignore_events: Vec<String>,
    reset_events: Vec<String>,
    previous: Option<DateTime<Utc>>,
    total: Duration,
    running: bool,
}

impl StopwatchTimer {
    pub fn new(start_event: impl Into<String>, end_event: impl Into<String>) -> Self {
        Self {
            start_event: start_event.into(),
            end_event: end_event.into(),
            ignore_events: Vec::new(),
            reset_events: Vec::new(),
            previous: None,
            total: Duration::zero(),
            running: false,
        }
    }

    #[must_use]
    pub fn with_ignore_events(mut self, events: Vec<String>) -> Self {
        self.ignore_events = events;
        self
    }

    #[must_use]
    pub fn with_reset_events(mut self, events: Vec<String>) -> Self {
        self.reset_events = events;
        self
    }

    pub fn from_args(args: &FactoryArgs<'_>) -> Result<Self, LoadError> {
        Ok(Self::new(args.str_arg("start_event")?, args.str_arg("end_event")?)
            .with_ignore_events(args.string_list_arg_or_empty("ignore_events")?)
            .with_reset_events(args.string_list_arg_or_empty("reset_events")?))
    }

    fn is_listed(events: &[String], name: &str) -> bool {
        events.iter().any(|event| event == name)
    }
}

impl Feature for StopwatchTimer {
    fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
        vec![ALL_EVENTS.to_string()]
    }

    fn update_from_event(&mut self, event: &Event) {
        if event.event_source == EventSource::Game {
            if Self::is_listed(&self.reset_events, &event.event_name) {
                self.previous = None;
                self.running = false;
            } else if Self::is_listed(&self.ignore_events, &event.event_name) {
                self.previous = None;
            }
            if let (true, Some(previous)) = (self.running, self.previous) {
                self.total = self.total + (event.timestamp - previous);
            }
            self.previous = Some(event.timestamp);
        }

        // Start and stop take effect after the gap ending here is counted.
        if event.event_name == self.start_event {
            self.running = true;
        } else if event.event_name == self.end_event {
            self.running = false;
        }
    }

    fn compute(&self) -> Vec<FeatureValue> {
        let millis = self.total.num_milliseconds();
        vec![json!(render_clock(millis)), json!(millis as f64 / 1000.0)]
    }

    fn subfeatures(&self) -> Vec<String> {
        vec!["Seconds".into()]
    }

    fn min_version(&self) -> Option<&str> {
        Some("1")
    }
}

fn render_clock(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.abs();
    let secs = millis / 1000;
    let clock = format!("{sign}{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60);
    match millis % 1000 {
        0 => clock,
        frac => format!("{clock}.{frac:03}"),
    }
}
