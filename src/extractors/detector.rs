//! Detectors: extractors that emit synthetic events.

use crate::core::{Event, ExtractionMode};

use super::extractor::{version_in_range, wants_event};
use super::filter::CountFilter;
use super::params::ExtractorParameters;

/// A detector computation.
///
/// Detectors accumulate over events only. Whenever `trigger_condition`
/// holds after an accepted event, `trigger_event` is called once to build
/// the synthetic event; it must also clear whatever state made the
/// condition true, so the detector does not fire again on the same state.
pub trait Detector: Send {
    /// Event names this detector needs, or [`ALL_EVENTS`](super::ALL_EVENTS).
    fn event_dependencies(&self, mode: ExtractionMode) -> Vec<String>;

    /// Accumulate an accepted event.
    fn update_from_event(&mut self, event: &Event);

    /// Whether a synthetic event should be emitted now.
    fn trigger_condition(&self) -> bool;

    /// Build the synthetic event and reset the firing state.
    fn trigger_event(&mut self) -> Event;

    fn min_version(&self) -> Option<&str> {
        None
    }

    fn max_version(&self) -> Option<&str> {
        None
    }
}

/// One registered detector.
pub struct DetectorInstance {
    params: ExtractorParameters,
    detector_type: String,
    filter: CountFilter,
    detector: Box<dyn Detector>,
    event_deps: Vec<String>,
    triggered: u64,
}

impl DetectorInstance {
    pub fn new(
        params: ExtractorParameters,
        detector_type: impl Into<String>,
        filter: CountFilter,
        detector: Box<dyn Detector>,
    ) -> Self {
        let event_deps = detector.event_dependencies(params.mode);
        Self {
            params,
            detector_type: detector_type.into(),
            filter,
            detector,
            event_deps,
            triggered: 0,
        }
    }

    #[must_use]
    pub fn params(&self) -> &ExtractorParameters {
        &self.params
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.params.name
    }

    #[must_use]
    pub fn detector_type(&self) -> &str {
        &self.detector_type
    }

    #[must_use]
    pub fn event_dependencies(&self) -> &[String] {
        &self.event_deps
    }

    /// Number of synthetic events emitted so far.
    #[must_use]
    pub fn triggered(&self) -> u64 {
        self.triggered
    }

    /// Offer an event to the detector.
    ///
    /// If the event is accepted and the trigger condition then holds, the
    /// synthetic event is handed to `sink` exactly once. Returns whether
    /// the event was accepted.
    pub fn extract_from_event(&mut self, event: &Event, sink: &mut dyn FnMut(Event)) -> bool {
        let accepted = version_in_range(
            event.log_version.as_deref(),
            self.detector.min_version(),
            self.detector.max_version(),
        ) && wants_event(&self.event_deps, &event.event_name)
            && self.filter.accepts(event, self.params.count_index);
        if !accepted {
            return false;
        }

        self.detector.update_from_event(event);
        if self.detector.trigger_condition() {
            let synthetic = self.detector.trigger_event();
            self.triggered += 1;
            sink(synthetic);
        }
        true
    }
}

impl std::fmt::Debug for DetectorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorInstance")
            .field("name", &self.params.name)
            .field("detector_type", &self.detector_type)
            .field("count_index", &self.params.count_index)
            .field("filter", &self.filter)
            .field("event_deps", &self.event_deps)
            .field("triggered", &self.triggered)
            .finish()
    }
}

impl std::fmt::Display for DetectorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.params.name, self.params.description)
    }
}
