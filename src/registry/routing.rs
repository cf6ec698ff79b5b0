//! Name-keyed listener tables.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::extractors::ALL_EVENTS;

use super::Listener;

type Bucket = SmallVec<[Listener; 4]>;

/// Map from a dependency name to the listeners that declared it.
#[derive(Clone, Debug, Default)]
pub(crate) struct ListenerTable {
    buckets: FxHashMap<String, Bucket>,
}

impl ListenerTable {
    /// Add `listener` under each distinct name in `keys`.
    pub fn add<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>, listener: &Listener) {
        for key in keys {
            let bucket = self.buckets.entry(key.clone()).or_default();
            if !bucket.iter().any(|l| l.name == listener.name) {
                bucket.push(listener.clone());
            }
        }
    }

    pub fn get(&self, key: &str) -> &[Listener] {
        self.buckets
            .get(key)
            .map(|bucket| bucket.as_slice())
            .unwrap_or(&[])
    }

    /// Names with at least one listener.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.buckets.keys()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Event-name routing with a wildcard bucket.
///
/// An extractor that declares [`ALL_EVENTS`] lands in the wildcard bucket
/// only, so it is reached exactly once per event even if it also names
/// specific events.
#[derive(Clone, Debug, Default)]
pub(crate) struct EventRouter {
    by_event: ListenerTable,
    wildcard: Vec<Listener>,
}

impl EventRouter {
    pub fn add(&mut self, dependencies: &[String], listener: &Listener) {
        if dependencies.iter().any(|d| d == ALL_EVENTS) {
            if !self.wildcard.iter().any(|l| l.name == listener.name) {
                self.wildcard.push(listener.clone());
            }
        } else {
            self.by_event.add(dependencies, listener);
        }
    }

    /// Listeners for `event_name`: named bucket first, then wildcard.
    pub fn listeners_for<'a>(&'a self, event_name: &str) -> impl Iterator<Item = &'a Listener> {
        self.by_event
            .get(event_name)
            .iter()
            .chain(self.wildcard.iter())
    }

    pub fn wildcard(&self) -> &[Listener] {
        &self.wildcard
    }

    pub fn clear(&mut self) {
        self.by_event.clear();
        self.wildcard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IterationMode;

    fn names<'a>(it: impl Iterator<Item = &'a Listener>) -> Vec<&'a str> {
        it.map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_named_and_wildcard_routing() {
        let mut router = EventRouter::default();
        router.add(
            &["click".into(), "hover".into()],
            &Listener::new("A", IterationMode::Aggregate),
        );
        router.add(&[ALL_EVENTS.into()], &Listener::new("B", IterationMode::Aggregate));

        assert_eq!(names(router.listeners_for("click")), vec!["A", "B"]);
        assert_eq!(names(router.listeners_for("hover")), vec!["A", "B"]);
        assert_eq!(names(router.listeners_for("quit")), vec!["B"]);
    }

    #[test]
    fn test_wildcard_wins_over_named() {
        let mut router = EventRouter::default();
        router.add(
            &["click".into(), ALL_EVENTS.into()],
            &Listener::new("A", IterationMode::Aggregate),
        );
        assert_eq!(names(router.listeners_for("click")), vec!["A"]);
        assert_eq!(router.wildcard().len(), 1);
    }

    #[test]
    fn test_duplicate_dependencies_collapse() {
        let mut table = ListenerTable::default();
        let listener = Listener::new("lvl0_Score", IterationMode::PerCount);
        table.add(&["x".to_string(), "x".to_string()], &listener);
        assert_eq!(table.get("x").len(), 1);
        assert!(table.get("y").is_empty());
    }

    #[test]
    fn test_zero_dependencies_never_routed() {
        let mut router = EventRouter::default();
        router.add(&[], &Listener::new("Silent", IterationMode::Aggregate));
        assert_eq!(router.listeners_for("anything").count(), 0);
    }
}
