//! Built-in extractors usable by any game.
//!
//! | Type | Kind | Arguments |
//! |---|---|---|
//! | `CountEvent` | feature | `target_event` |
//! | `Timespan` | feature | `start_event`, `end_event` |
//! | `StopwatchTimer` | feature | `start_event`, `end_event`, optional `ignore_events`, `reset_events` |
//! | `SessionDuration` | feature (session only) | none |
//! | `FeatureTotal` | second-order feature | `sources` |
//! | `CountThreshold` | detector | `target_event`, `threshold`, `emit_event` |
//! | `IdleGap` | detector | `idle_seconds`, `emit_event` (default `idle`) |

mod count_event;
mod count_threshold;
mod feature_total;
mod idle_gap;
mod session_duration;
mod stopwatch_timer;
mod timespan;

pub use count_event::CountEvent;
pub use count_threshold::CountThreshold;
pub use feature_total::FeatureTotal;
pub use idle_gap::IdleGap;
pub use session_duration::SessionDuration;
pub use stopwatch_timer::StopwatchTimer;
pub use timespan::Timespan;

use chrono::{DateTime, Utc};

use crate::extractors::{Detector, Feature};
use crate::loader::ExtractorCatalog;

/// Add every built-in type to `catalog`.
pub fn register_builtins(catalog: &mut ExtractorCatalog) {
    catalog.register_feature("CountEvent", |args| {
        CountEvent::from_args(args).map(|f| Box::new(f) as Box<dyn Feature>)
    });
    catalog.register_feature("Timespan", |args| {
        Timespan::from_args(args).map(|f| Box::new(f) as Box<dyn Feature>)
    });
    catalog.register_feature("StopwatchTimer", |args| {
        StopwatchTimer::from_args(args).map(|f| Box::new(f) as Box<dyn Feature>)
    });
    catalog.register_feature("SessionDuration", |_args| {
        Ok(Box::new(SessionDuration::new()) as Box<dyn Feature>)
    });
    catalog.register_feature("FeatureTotal", |args| {
        FeatureTotal::from_args(args).map(|f| Box::new(f) as Box<dyn Feature>)
    });
    catalog.register_detector("CountThreshold", |args| {
        CountThreshold::from_args(args).map(|d| Box::new(d) as Box<dyn Detector>)
    });
    catalog.register_detector("IdleGap", |args| {
        IdleGap::from_args(args).map(|d| Box::new(d) as Box<dyn Detector>)
    });
}

/// Signed seconds from `start` to `end`, millisecond precision.
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}
