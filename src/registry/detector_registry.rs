//! Flat registry of detectors.

use indexmap::IndexMap;
use log::debug;

use crate::core::{Event, ExtractionMode, IterationMode};
use crate::error::{RegistryError, Result};
use crate::extractors::{DetectorInstance, Extractor};

use super::routing::EventRouter;
use super::{ExtractionStage, ExtractorRegistry, Listener};

/// Registry of detector instances for one extraction unit.
///
/// Detectors never depend on each other's output, so there is a single
/// bucket and only event routing.
#[derive(Debug)]
pub struct DetectorRegistry {
    mode: ExtractionMode,
    stage: ExtractionStage,
    detectors: IndexMap<String, DetectorInstance>,
    events: EventRouter,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new(ExtractionMode::Detector)
    }
}

impl DetectorRegistry {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            stage: ExtractionStage::Empty,
            detectors: IndexMap::new(),
            events: EventRouter::default(),
        }
    }

    /// Route an event to every interested detector.
    ///
    /// Synthetic events produced along the way are handed to `sink` in the
    /// order the detectors fire. Returns how many instances accepted the
    /// event.
    pub fn extract_from_event(&mut self, event: &Event, sink: &mut dyn FnMut(Event)) -> Result<usize> {
        if self.stage >= ExtractionStage::FirstOrderFinalized {
            return Err(RegistryError::StageViolation {
                operation: "extract from event",
                stage: self.stage,
            });
        }
        if self.stage < ExtractionStage::Streaming {
            debug!("DetectorRegistry ({}) {} -> {}", self.mode, self.stage, ExtractionStage::Streaming);
            self.stage = ExtractionStage::Streaming;
        }

        let mut accepted = 0;
        for listener in self.events.listeners_for(&event.event_name) {
            if let Some(detector) = self.detectors.get_mut(&listener.name) {
                if detector.extract_from_event(event, sink) {
                    accepted += 1;
                }
            }
        }
        Ok(accepted)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DetectorInstance> {
        self.detectors.get(name)
    }

    /// Instances in registration order.
    pub fn detectors(&self) -> impl Iterator<Item = &DetectorInstance> {
        self.detectors.values()
    }

    /// Listeners that would receive an event named `event_name`.
    #[must_use]
    pub fn event_listeners(&self, event_name: &str) -> Vec<&Listener> {
        self.events.listeners_for(event_name).collect()
    }
}

impl ExtractorRegistry for DetectorRegistry {
    fn register(&mut self, extractor: Extractor, kind: IterationMode) -> Result<()> {
        let detector = match extractor {
            Extractor::Detector(detector) => detector,
            other => {
                return Err(RegistryError::TypeMismatch {
                    registry: "DetectorRegistry",
                    expected: "detector",
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
        if self.detectors.contains_key(detector.name()) {
            return Err(RegistryError::DuplicateExtractor(detector.name().to_string()));
        }

        self.events
            .add(detector.event_dependencies(), &Listener::new(detector.name(), kind));
        self.detectors.insert(detector.name().to_string(), detector);
        self.stage = ExtractionStage::Loaded;
        Ok(())
    }

    fn extractor_names(&self) -> Vec<String> {
        self.detectors.keys().cloned().collect()
    }

    fn mode(&self) -> ExtractionMode {
        self.mode
    }

    fn stage(&self) -> ExtractionStage {
        self.stage
    }

    fn len(&self) -> usize {
        self.detectors.len()
    }

    fn clear(&mut self) {
        debug!("Clearing DetectorRegistry ({})", self.mode);
        self.detectors.clear();
        self.events.clear();
        self.stage = ExtractionStage::Empty;
    }
}

impl std::fmt::Display for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.detectors.values().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FeatureValue;
    use crate::extractors::{CountFilter, Detector, ExtractorParameters, Feature, FeatureInstance};
    use chrono::{TimeZone, Utc};

    /// Fires on every `n`th `ping`.
    struct EveryN {
        n: u32,
        seen: u32,
        last_ts: i64,
    }

    impl Detector for EveryN {
        fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
            vec!["ping".into()]
        }
        fn update_from_event(&mut self, event: &Event) {
            self.seen += 1;
            self.last_ts = event.timestamp.timestamp();
        }
        fn trigger_condition(&self) -> bool {
            self.seen == self.n
        }
        fn trigger_event(&mut self) -> Event {
            self.seen = 0;
            Event::new("s", "pong", Utc.timestamp_opt(self.last_ts, 0).single().unwrap()).generated()
        }
    }

    struct Nothing;

    impl Feature for Nothing {
        fn event_dependencies(&self, _mode: ExtractionMode) -> Vec<String> {
            Vec::new()
        }
        fn update_from_event(&mut self, _event: &Event) {}
        fn compute(&self) -> Vec<FeatureValue> {
            Vec::new()
        }
    }

    fn every(name: &str, n: u32) -> Extractor {
        DetectorInstance::new(
            ExtractorParameters::new(name, ExtractionMode::Detector),
            "EveryN",
            CountFilter::Aggregate,
            Box::new(EveryN { n, seen: 0, last_ts: 0 }),
        )
        .into()
    }

    fn ping(ts: i64) -> Event {
        Event::new("s", "ping", Utc.timestamp_opt(ts, 0).single().unwrap())
    }

    #[test]
    fn test_sink_receives_synthetic_events() {
        let mut registry = DetectorRegistry::default();
        registry.register(every("Pair", 2), IterationMode::Aggregate).unwrap();
        registry.register(every("Triple", 3), IterationMode::Aggregate).unwrap();

        let mut out = Vec::new();
        for ts in 1..=6 {
            registry
                .extract_from_event(&ping(ts), &mut |e| out.push(e.timestamp.timestamp()))
                .unwrap();
        }
        // Pair fires at 2, 4, 6; Triple at 3, 6.
        assert_eq!(out, vec![2, 3, 4, 6, 6]);
        assert_eq!(registry.get("Pair").map(DetectorInstance::triggered), Some(3));
    }

    #[test]
    fn test_register_feature_is_type_error() {
        let mut registry = DetectorRegistry::default();
        let feature = FeatureInstance::new(
            ExtractorParameters::new("Nothing", ExtractionMode::Session),
            "Nothing",
            CountFilter::Aggregate,
            Box::new(Nothing),
        );
        let err = registry
            .register(feature.into(), IterationMode::Aggregate)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::TypeMismatch {
                registry: "DetectorRegistry",
                expected: "detector",
                found: "feature",
                name: "Nothing".into(),
            }
        );
    }

    #[test]
    fn test_names_and_clear() {
        let mut registry = DetectorRegistry::default();
        registry.register(every("Pair", 2), IterationMode::Aggregate).unwrap();
        assert_eq!(registry.extractor_names(), vec!["Pair"]);
        assert_eq!(registry.event_listeners("ping").len(), 1);

        registry.extract_from_event(&ping(1), &mut |_| {}).unwrap();
        assert!(registry.register(every("Late", 2), IterationMode::Aggregate).is_err());

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stage(), ExtractionStage::Empty);
    }
}
