//! Bounded in-process cache tier (L1).
//!
//! Eviction removes the key with the lowest access frequency. Frequency is
//! bumped on every successful read and reset to 1 on every write, so this
//! approximates LFU with a recency bias rather than being exact LRU.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::models::CacheEntry;

/// Default number of entries held in the memory tier.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Outcome of a memory tier lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierLookup<V> {
    Hit(V),
    Miss,
    /// The key was present but past its expiry; it has been removed.
    Expired,
}

impl<V> TierLookup<V> {
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Expired => None,
        }
    }
}

/// Fixed-capacity key/value map with per-entry expiry.
///
/// Not synchronised; the cache manager owns it behind a mutex.
#[derive(Debug)]
pub struct MemoryTier<V> {
    entries: HashMap<String, CacheEntry<V>>,
    frequency: HashMap<String, u64>,
    capacity: usize,
    next_sequence: u64,
}

impl<V: Clone> MemoryTier<V> {
    /// Create a tier holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            frequency: HashMap::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Look up `key`, counting the access on a hit and dropping the entry if
    /// it has expired.
    pub fn get(&mut self, key: &str, now: Instant) -> TierLookup<V> {
        let Some(entry) = self.entries.get(key) else {
            return TierLookup::Miss;
        };

        if !entry.is_valid_at(now) {
            self.remove(key);
            debug!(key, "memory tier entry expired");
            return TierLookup::Expired;
        }

        let value = entry.value.clone();
        *self.frequency.entry(key.to_string()).or_insert(0) += 1;
        TierLookup::Hit(value)
    }

    /// Insert or overwrite `key`, evicting one entry first if the tier is full
    /// and `key` is new. Returns the evicted key, if any.
    pub fn set(&mut self, key: String, value: V, ttl: Duration, now: Instant) -> Option<String> {
        let evicted = if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_one()
        } else {
            None
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.frequency.insert(key.clone(), 1);
        self.entries
            .insert(key, CacheEntry::new(value, now, ttl, sequence));
        evicted
    }

    /// Remove `key` and its frequency counter. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key)
    }

    /// Remove every key containing `substring` literally.
    pub fn remove_containing(&mut self, substring: &str) -> Vec<String> {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.contains(substring))
            .cloned()
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_valid_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.frequency.clear();
    }

    /// Whether `key` holds an unexpired value. Does not count as an access.
    pub fn contains_key(&self, key: &str, now: Instant) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.is_valid_at(now))
    }

    /// Current access frequency of `key`.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.frequency.get(key).copied()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn remove(&mut self, key: &str) -> bool {
        self.frequency.remove(key);
        self.entries.remove(key).is_some()
    }

    /// Evict the least frequently accessed key; ties go to the oldest insert.
    fn evict_one(&mut self) -> Option<String> {
        let victim = if self.frequency.is_empty() {
            // Frequency table out of sync: fall back to insertion order
            self.entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(key, _)| key.clone())
        } else {
            self.frequency
                .iter()
                .min_by_key(|(key, count)| {
                    let sequence = self.entries.get(*key).map_or(0, |e| e.sequence);
                    (**count, sequence)
                })
                .map(|(key, _)| key.clone())
        }?;

        self.remove(&victim);
        debug!(key = %victim, "memory tier evicted entry");
        Some(victim)
    }
}

impl<V: Clone> Default for MemoryTier<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_set_then_get() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("a".to_string(), 1, TTL, now);

        assert_eq!(tier.get("a", now), TierLookup::Hit(1));
        assert_eq!(tier.get("b", now), TierLookup::Miss);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("a".to_string(), 1, Duration::from_secs(5), now);

        let later = now + Duration::from_secs(6);
        assert_eq!(tier.get("a", later), TierLookup::Expired);
        assert_eq!(tier.len(), 0);
        assert_eq!(tier.frequency("a"), None);
        assert_eq!(tier.get("a", later), TierLookup::Miss);
    }

    #[test]
    fn test_frequency_counts_reads_and_resets_on_write() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("a".to_string(), 1, TTL, now);
        assert_eq!(tier.frequency("a"), Some(1));

        tier.get("a", now);
        tier.get("a", now);
        assert_eq!(tier.frequency("a"), Some(3));

        tier.set("a".to_string(), 2, TTL, now);
        assert_eq!(tier.frequency("a"), Some(1));
    }

    #[test]
    fn test_evicts_lowest_frequency() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(3);
        tier.set("hot".to_string(), 1, TTL, now);
        tier.set("warm".to_string(), 2, TTL, now);
        tier.set("cold".to_string(), 3, TTL, now);

        tier.get("hot", now);
        tier.get("hot", now);
        tier.get("warm", now);

        let evicted = tier.set("new".to_string(), 4, TTL, now);
        assert_eq!(evicted.as_deref(), Some("cold"));
        assert_eq!(tier.len(), 3);
        assert!(tier.contains_key("hot", now));
        assert!(tier.contains_key("warm", now));
        assert!(tier.contains_key("new", now));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(2);
        tier.set("a".to_string(), 1, TTL, now);
        tier.set("b".to_string(), 2, TTL, now);

        assert_eq!(tier.set("a".to_string(), 10, TTL, now), None);
        assert_eq!(tier.len(), 2);
        assert_eq!(tier.get("a", now), TierLookup::Hit(10));
    }

    #[test]
    fn test_eviction_falls_back_to_insertion_order() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(2);
        tier.set("first".to_string(), 1, TTL, now);
        tier.set("second".to_string(), 2, TTL, now);
        tier.frequency.clear();

        assert_eq!(tier.evict_one().as_deref(), Some("first"));
    }

    #[test]
    fn test_remove_containing_is_literal() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("user:1".to_string(), 1, TTL, now);
        tier.set("user:2".to_string(), 2, TTL, now);
        tier.set("order:1".to_string(), 3, TTL, now);
        tier.set("user*".to_string(), 4, TTL, now);

        let mut removed = tier.remove_containing("user:");
        removed.sort();
        assert_eq!(removed, vec!["user:1".to_string(), "user:2".to_string()]);

        // '*' is not a wildcard
        assert_eq!(tier.remove_containing("*"), vec!["user*".to_string()]);
        assert_eq!(tier.keys(), vec!["order:1".to_string()]);
    }

    #[test]
    fn test_purge_expired() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("short".to_string(), 1, Duration::from_secs(1), now);
        tier.set("long".to_string(), 2, TTL, now);

        assert_eq!(tier.purge_expired(now + Duration::from_secs(2)), 1);
        assert_eq!(tier.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(0);
        assert_eq!(tier.capacity(), 1);
        tier.set("a".to_string(), 1, TTL, now);
        tier.set("b".to_string(), 2, TTL, now);
        assert_eq!(tier.len(), 1);
        assert!(tier.contains_key("b", now));
    }

    #[test]
    fn test_clear() {
        let now = Instant::now();
        let mut tier = MemoryTier::new(10);
        tier.set("a".to_string(), 1, TTL, now);
        tier.clear();
        assert!(tier.is_empty());
        assert_eq!(tier.frequency("a"), None);
    }
}
