// Per-entity, per-day memoization of expensive analysis results.
//
// A hit requires the entry to have been computed on the current calendar
// day; older entries are treated as stale and overwritten by the next
// computation. Nothing is evicted — date rollover invalidates logically.

use chrono::NaiveDate;
use dashmap::DashMap;

struct DayEntry<V> {
    computed_on: NaiveDate,
    value: V,
}

/// Per-day result cache keyed by entity id
///
/// Backed by a concurrent map so per-entity enrichment may be parallelized
/// without extra locking. The key is the entity id alone: if an entity's
/// underlying data changes materially within one day, the stale value is
/// served until rollover.
pub struct DailyCache<V> {
    entries: DashMap<String, DayEntry<V>>,
}

impl<V: Clone> DailyCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Value computed for `key` on `today`, if any
    pub fn get(&self, key: &str, today: NaiveDate) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.computed_on == today)
            .map(|entry| entry.value.clone())
    }

    /// Record a fresh result, replacing any stale entry
    pub fn insert(&self, key: &str, today: NaiveDate, value: V) {
        self.entries.insert(
            key.to_string(),
            DayEntry {
                computed_on: today,
                value,
            },
        );
    }

    /// All entries computed on `today`, sorted by key
    pub fn entries_for(&self, today: NaiveDate) -> Vec<(String, V)> {
        let mut entries: Vec<(String, V)> = self
            .entries
            .iter()
            .filter(|entry| entry.value().computed_on == today)
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for DailyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
