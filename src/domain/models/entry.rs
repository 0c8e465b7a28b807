use std::time::{Duration, Instant};

/// Longest TTL honoured by the memory tier; larger values are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A value held in the memory tier together with its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
    /// Monotonic insertion sequence, used as the eviction fallback order.
    pub(crate) sequence: u64,
}

impl<V> CacheEntry<V> {
    /// Create an entry that expires `ttl` after `now`.
    pub fn new(value: V, now: Instant, ttl: Duration, sequence: u64) -> Self {
        let ttl = ttl.min(MAX_TTL);
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        Self {
            value,
            expires_at,
            sequence,
        }
    }

    /// An entry is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        self.expires_at > now
    }

    /// Time left before expiry, zero if already expired.
    pub fn remaining_ttl(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}
