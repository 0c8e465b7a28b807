//! Cache counters and their read-only snapshots.
//!
//! Request counters share one lock so that a snapshot always observes
//! `total_requests == l1_hits + l1_misses`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    l1_hits: u64,
    l1_misses: u64,
    l2_hits: u64,
    l2_misses: u64,
    total_requests: u64,
    sets: u64,
    deletes: u64,
    evictions: u64,
    expirations: u64,
}

/// Process-wide counters owned by a single cache manager.
#[derive(Debug, Default)]
pub struct CacheStatistics {
    counters: Mutex<Counters>,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one request and its memory-tier outcome.
    pub fn record_l1(&self, hit: bool) {
        let mut c = self.lock();
        c.total_requests += 1;
        if hit {
            c.l1_hits += 1;
        } else {
            c.l1_misses += 1;
        }
    }

    pub fn record_l2(&self, hit: bool) {
        let mut c = self.lock();
        if hit {
            c.l2_hits += 1;
        } else {
            c.l2_misses += 1;
        }
    }

    pub fn record_set(&self) {
        self.lock().sets += 1;
    }

    pub fn record_delete(&self) {
        self.lock().deletes += 1;
    }

    pub fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.lock().evictions += count;
        }
    }

    pub fn record_expirations(&self, count: u64) {
        if count > 0 {
            self.lock().expirations += count;
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }

    /// Copy the counters and compute derived rates.
    pub fn snapshot(&self, l1_size: usize, l1_max_size: usize) -> StatsSnapshot {
        let c = *self.lock();
        StatsSnapshot {
            l1_hits: c.l1_hits,
            l1_misses: c.l1_misses,
            l2_hits: c.l2_hits,
            l2_misses: c.l2_misses,
            total_requests: c.total_requests,
            sets: c.sets,
            deletes: c.deletes,
            evictions: c.evictions,
            expirations: c.expirations,
            l1_hit_rate: ratio(c.l1_hits, c.total_requests),
            l2_hit_rate: ratio(c.l2_hits, c.total_requests.saturating_sub(c.l1_hits)),
            overall_hit_rate: ratio(c.l1_hits + c.l2_hits, c.total_requests),
            l1_size,
            l1_max_size,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Point-in-time view of the cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub l1_hits: u64,
    pub l1_misses: u64,
    pub l2_hits: u64,
    pub l2_misses: u64,
    pub total_requests: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub l1_hit_rate: f64,
    pub l2_hit_rate: f64,
    pub overall_hit_rate: f64,
    pub l1_size: usize,
    pub l1_max_size: usize,
}

/// Lock-free counters for the write-back worker.
#[derive(Debug, Default)]
pub struct WriteBackStats {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
    abandoned: AtomicU64,
}

impl WriteBackStats {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriteBackSnapshot {
        WriteBackSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the write-back worker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackSnapshot {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
    /// Queued writes discarded because their key was deleted or rewritten.
    pub skipped: u64,
    pub abandoned: u64,
}

impl WriteBackSnapshot {
    /// Jobs accepted by the queue that have not finished either way.
    pub const fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.completed + self.failed + self.skipped + self.abandoned)
    }
}
