//! Detector extraction with cascading synthetic events.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::core::Event;
use crate::error::Result;
use crate::loader::{ExtractorLoader, LoadReport};
use crate::registry::{DetectorRegistry, ExtractorRegistry};

use super::ProcessorConfig;

/// Owns a loader and a detector registry.
///
/// Synthetic events are fed back to the detectors in FIFO order until no
/// more are produced or `max_synthetic_events` is reached for the current
/// outer event.
#[derive(Debug)]
pub struct DetectorProcessor {
    loader: ExtractorLoader,
    registry: DetectorRegistry,
    report: LoadReport,
    config: ProcessorConfig,
    dropped: u64,
}

impl DetectorProcessor {
    pub fn new(loader: ExtractorLoader, config: ProcessorConfig) -> Result<Self> {
        let mut registry = DetectorRegistry::new(loader.mode());
        let report = loader.load_to_detector_registry(&mut registry)?;
        Ok(Self {
            loader,
            registry,
            report,
            config,
            dropped: 0,
        })
    }

    #[must_use]
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    #[must_use]
    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn extractor_names(&self) -> Vec<String> {
        self.registry.extractor_names()
    }

    /// Synthetic events dropped at the cap so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Run `event` through the detectors, returning every synthetic event
    /// it produced, cascades included, in emission order.
    pub fn process_event(&mut self, event: &Event) -> Result<Vec<Event>> {
        let mut queue = VecDeque::new();
        self.registry
            .extract_from_event(event, &mut |synthetic| queue.push_back(synthetic))?;

        let limit = self.config.max_synthetic_events;
        let mut emitted = Vec::new();
        while let Some(synthetic) = queue.pop_front() {
            if emitted.len() >= limit {
                let dropped = queue.len() + 1;
                warn!(
                    "Synthetic event limit of {} reached while processing '{}' ({}), dropping {} event(s)",
                    limit, event.event_name, event.session_id, dropped
                );
                self.dropped += dropped as u64;
                break;
            }
            self.registry
                .extract_from_event(&synthetic, &mut |next| queue.push_back(next))?;
            emitted.push(synthetic);
        }
        Ok(emitted)
    }

    /// Rebuild every detector for a new unit.
    pub fn reset(&mut self) -> Result<()> {
        debug!("Resetting DetectorProcessor");
        self.registry.clear();
        self.loader = self.loader.for_new_unit();
        self.report = self.loader.load_to_detector_registry(&mut self.registry)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventSource, ExtractionMode};
    use crate::loader::ExtractorCatalog;
    use crate::schema::{ExtractorConfig, GameSchema};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn loader(schema: GameSchema) -> ExtractorLoader {
        ExtractorLoader::new(Arc::new(schema), Arc::new(ExtractorCatalog::builtin()), ExtractionMode::Detector)
    }

    fn threshold(target: &str, n: u64, emit: &str) -> ExtractorConfig {
        ExtractorConfig::new("CountThreshold")
            .with_arg("target_event", target)
            .with_arg("threshold", n)
            .with_arg("emit_event", emit)
    }

    fn click(secs: i64) -> Event {
        Event::new("s1", "click", Utc.timestamp_opt(secs, 0).single().unwrap())
    }

    #[test]
    fn test_cascade_is_fed_back() {
        let schema = GameSchema::new("TEST")
            .with_aggregate_detector("Pairs", threshold("click", 2, "pair"))
            .with_aggregate_detector("PairOfPairs", threshold("pair", 2, "quad"));
        let mut processor = DetectorProcessor::new(loader(schema), ProcessorConfig::default()).unwrap();

        let mut names = Vec::new();
        for i in 1..=4 {
            for event in processor.process_event(&click(i)).unwrap() {
                assert_eq!(event.event_source, EventSource::Generated);
                names.push(event.event_name);
            }
        }
        assert_eq!(names, vec!["pair", "pair", "quad"]);
    }

    #[test]
    fn test_self_feeding_detector_is_capped() {
        // Fires on its own output forever.
        let schema = GameSchema::new("TEST")
            .with_aggregate_detector("Echo", threshold("ping", 1, "ping"));
        let config = ProcessorConfig::default().with_max_synthetic_events(5);
        let mut processor = DetectorProcessor::new(loader(schema), config).unwrap();

        let ping = Event::new("s1", "ping", Utc.timestamp_opt(1, 0).single().unwrap());
        let emitted = processor.process_event(&ping).unwrap();
        assert_eq!(emitted.len(), 5);
        assert_eq!(processor.dropped(), 1);
    }

    #[test]
    fn test_reset_rebuilds_detectors() {
        let schema = GameSchema::new("TEST").with_aggregate_detector("Pairs", threshold("click", 2, "pair"));
        let mut processor = DetectorProcessor::new(loader(schema), ProcessorConfig::default()).unwrap();

        processor.process_event(&click(1)).unwrap();
        processor.reset().unwrap();
        assert!(processor.process_event(&click(2)).unwrap().is_empty());
        assert_eq!(processor.process_event(&click(3)).unwrap().len(), 1);
        assert_eq!(processor.extractor_names(), vec!["Pairs"]);
    }
}
