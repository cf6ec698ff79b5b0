//! Processor configuration.

use serde::{Deserialize, Serialize};

/// Default cap on synthetic events per outer event.
pub const DEFAULT_MAX_SYNTHETIC_EVENTS: usize = 64;

/// Knobs shared by the processors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Maximum synthetic events produced while handling one outer event,
    /// cascades included. Anything beyond is dropped with a warning.
    pub max_synthetic_events: usize,

    /// Log a warning when an event arrives out of `(timestamp, index)`
    /// order.
    pub warn_on_out_of_order: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_synthetic_events: DEFAULT_MAX_SYNTHETIC_EVENTS,
            warn_on_out_of_order: true,
        }
    }
}

impl ProcessorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the synthetic event cap (builder pattern).
    #[must_use]
    pub fn with_max_synthetic_events(mut self, max: usize) -> Self {
        self.max_synthetic_events = max;
        self
    }

    /// Toggle out-of-order warnings (builder pattern).
    #[must_use]
    pub fn with_warn_on_out_of_order(mut self, warn: bool) -> Self {
        self.warn_on_out_of_order = warn;
        self
    }
}
