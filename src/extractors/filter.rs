//! Count-index acceptance strategies.
//!
//! Every instance of a per-count family sees the same events; the filter
//! decides which of them belong to the instance's bucket. The strategy is
//! picked per instance at load time.

use std::borrow::Cow;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::core::Event;

/// Lookup from a game-specific key (job name, difficulty, region...) to a
/// count index.
pub type MappingTable = Arc<FxHashMap<String, u32>>;

/// Game-supplied acceptance predicate: `(event, count_index) -> accept`.
pub type CountPredicate = Arc<dyn Fn(&Event, u32) -> bool + Send + Sync>;

/// Decides whether an event belongs to an instance's count bucket.
#[derive(Clone, Default)]
pub enum CountFilter {
    /// No per-event filter. Used by aggregate instances.
    #[default]
    Aggregate,

    /// The numeric field `key` (event data, then game state) must equal
    /// the count index.
    Level { key: String },

    /// The field `key` (game state, then event data) mapped through
    /// `table` must equal the count index.
    Mapped { key: String, table: MappingTable },

    /// The event's user id mapped through `table` must equal the count index.
    User { table: MappingTable },

    /// Arbitrary game-specific predicate.
    Custom(CountPredicate),
}

impl CountFilter {
    /// Level filter on the conventional `level` field.
    pub fn level() -> Self {
        Self::Level { key: "level".into() }
    }

    /// Mapped filter on `key`.
    pub fn mapped(key: impl Into<String>, table: MappingTable) -> Self {
        Self::Mapped {
            key: key.into(),
            table,
        }
    }

    /// Check whether `event` belongs to the bucket `count_index`.
    ///
    /// Aggregate filters accept everything. Any other filter rejects
    /// events when the instance has no count index.
    #[must_use]
    pub fn accepts(&self, event: &Event, count_index: Option<u32>) -> bool {
        if let CountFilter::Aggregate = self {
            return true;
        }
        let Some(index) = count_index else {
            return false;
        };

        match self {
            CountFilter::Aggregate => true,
            CountFilter::Level { key } => event
                .data(key)
                .or_else(|| event.state(key))
                .and_then(value_as_index)
                .is_some_and(|level| level == u64::from(index)),
            CountFilter::Mapped { key, table } => event
                .context_value(key)
                .and_then(value_as_key)
                .and_then(|k| table.get(k.as_ref()).copied())
                .is_some_and(|mapped| mapped == index),
            CountFilter::User { table } => event
                .user_id
                .as_deref()
                .and_then(|user| table.get(user).copied())
                .is_some_and(|mapped| mapped == index),
            CountFilter::Custom(predicate) => predicate(event, index),
        }
    }

    /// Short name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CountFilter::Aggregate => "aggregate",
            CountFilter::Level { .. } => "level",
            CountFilter::Mapped { .. } => "mapped",
            CountFilter::User { .. } => "user",
            CountFilter::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Debug for CountFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountFilter::Aggregate => f.write_str("Aggregate"),
            CountFilter::Level { key } => f.debug_struct("Level").field("key", key).finish(),
            CountFilter::Mapped { key, table } => f
                .debug_struct("Mapped")
                .field("key", key)
                .field("entries", &table.len())
                .finish(),
            CountFilter::User { table } => {
                f.debug_struct("User").field("entries", &table.len()).finish()
            }
            CountFilter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn value_as_index(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_key(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        Event::new("s", "e", Utc.timestamp_opt(0, 0).single().unwrap())
    }

    fn jobs() -> MappingTable {
        let mut table = FxHashMap::default();
        table.insert("no-active-job".to_string(), 0);
        table.insert("kelp-farm".to_string(), 1);
        table.insert("coral-survey".to_string(), 2);
        Arc::new(table)
    }

    #[test]
    fn test_aggregate_accepts_all() {
        assert!(CountFilter::Aggregate.accepts(&event(), None));
        assert!(CountFilter::Aggregate.accepts(&event(), Some(3)));
    }

    #[test]
    fn test_level_filter() {
        let filter = CountFilter::level();
        let lvl1 = event().with_data("level", 1);
        assert!(filter.accepts(&lvl1, Some(1)));
        assert!(!filter.accepts(&lvl1, Some(0)));
        assert!(!filter.accepts(&lvl1, None));
        assert!(!filter.accepts(&event(), Some(1)));

        let text = event().with_data("level", "2");
        assert!(filter.accepts(&text, Some(2)));
    }

    #[test]
    fn test_level_falls_back_to_state() {
        let filter = CountFilter::level();
        let from_state = event().with_state("level", 4);
        assert!(filter.accepts(&from_state, Some(4)));
    }

    #[test]
    fn test_mapped_filter() {
        let filter = CountFilter::mapped("job_name", jobs());
        let in_state = event().with_state("job_name", "kelp-farm");
        assert!(filter.accepts(&in_state, Some(1)));
        assert!(!filter.accepts(&in_state, Some(2)));

        let in_data = event().with_data("job_name", "coral-survey");
        assert!(filter.accepts(&in_data, Some(2)));

        let unknown = event().with_data("job_name", "mystery");
        assert!(!filter.accepts(&unknown, Some(0)));
    }

    #[test]
    fn test_user_filter() {
        let mut table = FxHashMap::default();
        table.insert("alice".to_string(), 0);
        table.insert("bob".to_string(), 1);
        let filter = CountFilter::User { table: Arc::new(table) };

        assert!(filter.accepts(&event().with_user("bob"), Some(1)));
        assert!(!filter.accepts(&event().with_user("bob"), Some(0)));
        assert!(!filter.accepts(&event(), Some(0)));
    }

    #[test]
    fn test_custom_filter() {
        let filter = CountFilter::Custom(Arc::new(|event: &Event, index: u32| {
            event.event_name.len() as u32 == index
        }));
        assert!(filter.accepts(&event(), Some(1)));
        assert!(!filter.accepts(&event(), Some(2)));
        assert_eq!(filter.kind(), "custom");
    }
}
