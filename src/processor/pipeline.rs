//! One session's event stream through detectors and features.

use chrono::{DateTime, Utc};
use log::warn;

use crate::core::{Event, FeatureValue};
use crate::error::Result;

use super::{DetectorProcessor, FeatureProcessor, ProcessorConfig};

/// Feeds events to a `FeatureProcessor`, and to an optional
/// `DetectorProcessor` whose synthetic events follow the event that
/// caused them.
#[derive(Debug)]
pub struct SessionPipeline {
    features: FeatureProcessor,
    detectors: Option<DetectorProcessor>,
    config: ProcessorConfig,
    last_key: Option<(DateTime<Utc>, u64)>,
    out_of_order: u64,
}

impl SessionPipeline {
    pub fn new(features: FeatureProcessor, config: ProcessorConfig) -> Self {
        Self {
            features,
            detectors: None,
            config,
            last_key: None,
            out_of_order: 0,
        }
    }

    /// Attach detectors (builder pattern).
    #[must_use]
    pub fn with_detectors(mut self, detectors: DetectorProcessor) -> Self {
        self.detectors = Some(detectors);
        self
    }

    #[must_use]
    pub fn features(&self) -> &FeatureProcessor {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut FeatureProcessor {
        &mut self.features
    }

    #[must_use]
    pub fn detectors(&self) -> Option<&DetectorProcessor> {
        self.detectors.as_ref()
    }

    /// Events seen behind the running `(timestamp, index)` maximum.
    #[must_use]
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    /// Deliver one logged event, then any synthetic events it caused.
    ///
    /// Returns the synthetic events.
    pub fn process_event(&mut self, event: &Event) -> Result<Vec<Event>> {
        self.check_order(event);
        self.features.process_event(event)?;

        let synthetic = match self.detectors.as_mut() {
            Some(detectors) => detectors.process_event(event)?,
            None => Vec::new(),
        };
        for generated in &synthetic {
            self.features.process_event(generated)?;
        }
        Ok(synthetic)
    }

    pub fn process_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) -> Result<()> {
        for event in events {
            self.process_event(event)?;
        }
        Ok(())
    }

    /// Header row for `finalize`.
    #[must_use]
    pub fn extractor_names(&self) -> Vec<String> {
        self.features.extractor_names()
    }

    /// Close the session and produce its row.
    pub fn finalize(&mut self) -> Result<Vec<FeatureValue>> {
        self.features.finalize()
    }

    /// Start a new session with the same schema.
    pub fn reset(&mut self, player_id: Option<&str>, session_id: Option<&str>) -> Result<()> {
        self.features.reset(player_id, session_id)?;
        if let Some(detectors) = self.detectors.as_mut() {
            detectors.reset()?;
        }
        self.last_key = None;
        self.out_of_order = 0;
        Ok(())
    }

    fn check_order(&mut self, event: &Event) {
        let key = event.order_key();
        match self.last_key {
            Some(last) if key < last => {
                self.out_of_order += 1;
                if self.config.warn_on_out_of_order {
                    warn!(
                        "Event '{}' in session {} arrived out of order ({} after {})",
                        event.event_name, event.session_id, key.0, last.0
                    );
                }
            }
            _ => self.last_key = Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExtractionMode;
    use crate::loader::{ExtractorCatalog, ExtractorLoader};
    use crate::schema::{ExtractorConfig, GameSchema};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn pipeline() -> SessionPipeline {
        let schema = Arc::new(
            GameSchema::new("TEST")
                .with_aggregate_feature(
                    "Pairs",
                    ExtractorConfig::new("CountEvent").with_arg("target_event", "pair"),
                )
                .with_aggregate_detector(
                    "PairDetector",
                    ExtractorConfig::new("CountThreshold")
                        .with_arg("target_event", "click")
                        .with_arg("threshold", 2)
                        .with_arg("emit_event", "pair"),
                ),
        );
        let catalog = Arc::new(ExtractorCatalog::builtin());
        let config = ProcessorConfig::default();
        let features = FeatureProcessor::new(
            ExtractorLoader::new(schema.clone(), catalog.clone(), ExtractionMode::Session),
            Some("p1"),
            Some("s1"),
        )
        .unwrap();
        let detectors = DetectorProcessor::new(
            ExtractorLoader::new(schema, catalog, ExtractionMode::Detector),
            config.clone(),
        )
        .unwrap();
        SessionPipeline::new(features, config).with_detectors(detectors)
    }

    fn click(secs: i64, index: u64) -> Event {
        Event::new("s1", "click", Utc.timestamp_opt(secs, 0).single().unwrap()).with_index(index)
    }

    #[test]
    fn test_synthetic_events_reach_features() {
        let mut pipeline = pipeline();
        let events: Vec<Event> = (1..=5).map(|i| click(i, i as u64)).collect();
        pipeline.process_events(&events).unwrap();

        let row = pipeline.finalize().unwrap();
        assert_eq!(row, vec![json!("p1"), json!("s1"), json!(2)]);
    }

    #[test]
    fn test_out_of_order_is_counted_not_rejected() {
        let mut pipeline = pipeline();
        pipeline.process_event(&click(10, 1)).unwrap();
        pipeline.process_event(&click(5, 2)).unwrap();
        pipeline.process_event(&click(10, 3)).unwrap();
        assert_eq!(pipeline.out_of_order(), 1);
    }

    #[test]
    fn test_reset_clears_order_tracking() {
        let mut pipeline = pipeline();
        pipeline.process_event(&click(10, 1)).unwrap();
        pipeline.reset(Some("p1"), Some("s2")).unwrap();
        pipeline.process_event(&click(1, 1)).unwrap();
        assert_eq!(pipeline.out_of_order(), 0);
    }
}
