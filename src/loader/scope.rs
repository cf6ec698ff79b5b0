//! State shared by the extractors of one extraction unit.

use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

type Slot = Arc<dyn Any + Send + Sync>;

/// Per-unit store of shared trackers.
///
/// Some extractor families parse the same stream once and share the result
/// between instances (e.g. every per-count instance of a click tracker).
/// Each loader owns one scope, so sharing never crosses extraction units.
/// Clones refer to the same store.
#[derive(Clone, Default)]
pub struct UnitScope {
    slots: Arc<Mutex<FxHashMap<(String, TypeId), Slot>>>,
}

impl UnitScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared value for `key`, created with `T::default()` on first use.
    ///
    /// Every caller asking for the same key and type gets the same handle.
    pub fn shared<T>(&self, key: &str) -> Arc<Mutex<T>>
    where
        T: Default + Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots
            .entry((key.to_string(), TypeId::of::<Mutex<T>>()))
            .or_insert_with(|| Arc::new(Mutex::new(T::default())) as Slot)
            .clone();
        match slot.downcast::<Mutex<T>>() {
            Ok(value) => value,
            // The map is keyed by type, so the downcast cannot miss.
            Err(_) => Arc::new(Mutex::new(T::default())),
        }
    }

    /// Number of distinct shared values handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for UnitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitScope").field("slots", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_handle() {
        let scope = UnitScope::new();
        let a = scope.shared::<Vec<u32>>("clicks");
        let b = scope.shared::<Vec<u32>>("clicks");
        a.lock().unwrap().push(7);
        assert_eq!(*b.lock().unwrap(), vec![7]);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_types_are_separate() {
        let scope = UnitScope::new();
        *scope.shared::<u64>("x").lock().unwrap() = 3;
        assert_eq!(*scope.shared::<i32>("x").lock().unwrap(), 0);
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn test_scopes_do_not_share() {
        let first = UnitScope::new();
        let second = UnitScope::new();
        *first.shared::<u64>("x").lock().unwrap() = 3;
        assert_eq!(*second.shared::<u64>("x").lock().unwrap(), 0);

        let clone = first.clone();
        assert_eq!(*clone.shared::<u64>("x").lock().unwrap(), 3);
    }
}
