//! Bounded result cache keyed by settings fingerprints.
//!
//! The cache only makes sense for a single source document: fingerprints
//! identify settings, not inputs, so the owner purges it whenever a new
//! document is loaded.

use std::collections::{HashMap, VecDeque};

use crate::TRACING_TARGET_CACHE;
use crate::settings::Fingerprint;
use crate::types::ResultValue;

/// Default number of results kept per source document.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Bounded FIFO map from [`Fingerprint`] to [`ResultValue`].
///
/// Eviction follows insertion order. Lookups never affect the order, and
/// overwriting an existing fingerprint keeps its original position.
#[derive(Debug, Clone)]
pub struct ResultCache {
    capacity: usize,
    entries: HashMap<Fingerprint, ResultValue>,
    order: VecDeque<Fingerprint>,
}

impl ResultCache {
    /// Creates an empty cache holding at most `capacity` results.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.saturating_add(1)),
            order: VecDeque::with_capacity(capacity.saturating_add(1)),
        }
    }

    /// Returns the cached result for `fingerprint`, if any.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<ResultValue> {
        let hit = self.entries.get(fingerprint).cloned();
        tracing::debug!(
            target: TRACING_TARGET_CACHE,
            fingerprint = %fingerprint,
            cache_hit = hit.is_some(),
            "Looked up cached result"
        );
        hit
    }

    /// Stores `value` under `fingerprint`, evicting the oldest entry when full.
    pub fn add(&mut self, fingerprint: Fingerprint, value: ResultValue) {
        if let Some(existing) = self.entries.get_mut(&fingerprint) {
            *existing = value;
            tracing::debug!(
                target: TRACING_TARGET_CACHE,
                fingerprint = %fingerprint,
                "Replaced cached result"
            );
            return;
        }

        self.order.push_back(fingerprint.clone());
        self.entries.insert(fingerprint, value);

        while self.order.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(
                target: TRACING_TARGET_CACHE,
                fingerprint = %oldest,
                capacity = self.capacity,
                "Evicted oldest cached result"
            );
        }
    }

    /// Removes every entry.
    pub fn purge(&mut self) {
        let purged = self.entries.len();
        self.entries.clear();
        self.order.clear();
        tracing::debug!(
            target: TRACING_TARGET_CACHE,
            purged,
            "Purged result cache"
        );
    }

    /// Number of cached results.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dimensions;

    fn fingerprint(n: usize) -> Fingerprint {
        Fingerprint::from(format!("fp-{n}"))
    }

    fn value(n: usize) -> ResultValue {
        ResultValue::new(format!("<svg id=\"{n}\"/>"), Dimensions::new(n as f64, 1.0))
    }

    #[test]
    fn test_add_then_lookup_returns_same_value() {
        let mut cache = ResultCache::new(3);
        let stored = value(1);
        cache.add(fingerprint(1), stored.clone());

        let hit = cache.lookup(&fingerprint(1)).unwrap();
        assert!(hit.ptr_eq(&stored));
        assert!(cache.lookup(&fingerprint(2)).is_none());
    }

    #[test]
    fn test_overflow_evicts_first_inserted_only() {
        let mut cache = ResultCache::new(3);
        let values: Vec<_> = (0..4).map(value).collect();
        for (n, v) in values.iter().enumerate() {
            cache.add(fingerprint(n), v.clone());
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.lookup(&fingerprint(0)).is_none());
        for n in 1..4 {
            assert!(cache.lookup(&fingerprint(n)).unwrap().ptr_eq(&values[n]));
        }
    }

    #[test]
    fn test_lookup_does_not_refresh_order() {
        let mut cache = ResultCache::new(2);
        cache.add(fingerprint(0), value(0));
        cache.add(fingerprint(1), value(1));

        // An LRU would keep entry 0 after this lookup; FIFO does not.
        assert!(cache.lookup(&fingerprint(0)).is_some());
        cache.add(fingerprint(2), value(2));

        assert!(cache.lookup(&fingerprint(0)).is_none());
        assert!(cache.lookup(&fingerprint(1)).is_some());
        assert!(cache.lookup(&fingerprint(2)).is_some());
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let mut cache = ResultCache::new(2);
        cache.add(fingerprint(0), value(0));
        cache.add(fingerprint(1), value(1));

        let replacement = value(10);
        cache.add(fingerprint(0), replacement.clone());
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&fingerprint(0)).unwrap().ptr_eq(&replacement));

        cache.add(fingerprint(2), value(2));
        assert!(cache.lookup(&fingerprint(0)).is_none());
        assert!(cache.lookup(&fingerprint(1)).is_some());
    }

    #[test]
    fn test_purge_clears_every_key() {
        let mut cache = ResultCache::default();
        for n in 0..5 {
            cache.add(fingerprint(n), value(n));
        }
        cache.purge();

        assert!(cache.is_empty());
        for n in 0..5 {
            assert!(cache.lookup(&fingerprint(n)).is_none());
        }

        // Still usable after a purge.
        cache.add(fingerprint(7), value(7));
        assert!(cache.lookup(&fingerprint(7)).is_some());
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(ResultCache::default().capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
