//! Supervised write-back worker.
//!
//! `WriteBack` sets hand their remote write to a bounded queue drained by a
//! single background task. Enqueue never waits: when the queue is full or
//! the worker has shut down the job is dropped and counted. Shutdown either
//! drains the queue or abandons what is left.
//!
//! Each accepted job holds a ticket for its key. Only the latest ticket per
//! key is applied; deleting a key cancels its ticket, so a queued write
//! cannot resurrect it. A write the worker has already started still lands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::models::{ShutdownMode, WriteBackSnapshot, WriteBackStats};
use crate::services::remote_gateway::RemoteGateway;

/// Default bound on queued write-backs.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Largest queue bound the channel accepts.
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// A pending remote write.
#[derive(Debug, Clone)]
pub struct WriteBackJob {
    pub key: String,
    pub payload: String,
    pub ttl: Duration,
}

#[derive(Debug)]
struct Queued {
    ticket: u64,
    job: WriteBackJob,
}

/// Latest accepted ticket per key.
#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    latest: HashMap<String, u64>,
}

impl Tickets {
    fn is_current(&self, key: &str, ticket: u64) -> bool {
        self.latest.get(key) == Some(&ticket)
    }

    fn release(&mut self, key: &str, ticket: u64) {
        if self.is_current(key, ticket) {
            self.latest.remove(key);
        }
    }
}

fn lock_tickets(tickets: &Mutex<Tickets>) -> MutexGuard<'_, Tickets> {
    tickets.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the background worker that applies queued remote writes.
#[derive(Debug)]
pub struct WriteBackWorker {
    sender: Mutex<Option<mpsc::Sender<Queued>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    tickets: Arc<Mutex<Tickets>>,
    stats: Arc<WriteBackStats>,
}

impl WriteBackWorker {
    /// Start the worker on the current Tokio runtime.
    pub fn spawn(gateway: Arc<RemoteGateway>, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.clamp(1, MAX_QUEUE_CAPACITY));
        let stats = Arc::new(WriteBackStats::default());
        let tickets = Arc::new(Mutex::new(Tickets::default()));

        let task = tokio::spawn(run_loop(gateway, rx, tickets.clone(), stats.clone()));

        Self {
            sender: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
            tickets,
            stats,
        }
    }

    /// Queue a remote write without waiting. Returns whether it was accepted.
    pub fn enqueue(&self, job: WriteBackJob) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(sender) = sender else {
            warn!(key = %job.key, "write-back worker stopped, remote write dropped");
            self.stats.record_dropped();
            return false;
        };

        let mut tickets = lock_tickets(&self.tickets);
        tickets.next += 1;
        let ticket = tickets.next;
        let previous = tickets.latest.insert(job.key.clone(), ticket);

        let rejected = match sender.try_send(Queued { ticket, job }) {
            Ok(()) => {
                self.stats.record_enqueued();
                return true;
            }
            Err(TrySendError::Full(queued)) => {
                warn!(key = %queued.job.key, "write-back queue full, remote write dropped");
                queued
            }
            Err(TrySendError::Closed(queued)) => {
                warn!(key = %queued.job.key, "write-back worker gone, remote write dropped");
                queued
            }
        };

        match previous {
            Some(earlier) => tickets.latest.insert(rejected.job.key, earlier),
            None => tickets.latest.remove(&rejected.job.key),
        };
        self.stats.record_dropped();
        false
    }

    /// Skip any queued write for `key`.
    pub fn cancel(&self, key: &str) {
        lock_tickets(&self.tickets).latest.remove(key);
    }

    /// Skip queued writes for every key containing `substring`.
    pub fn cancel_containing(&self, substring: &str) {
        lock_tickets(&self.tickets)
            .latest
            .retain(|key, _| !key.contains(substring));
    }

    pub fn cancel_all(&self) {
        lock_tickets(&self.tickets).latest.clear();
    }

    pub fn stats(&self) -> WriteBackSnapshot {
        self.stats.snapshot()
    }

    /// Whether the worker still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop accepting jobs and finish according to `mode`. Calling it again
    /// is a no-op that returns the final counters.
    pub async fn shutdown(&self, mode: ShutdownMode) -> WriteBackSnapshot {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some(task) = task {
            match mode {
                ShutdownMode::Drain => {
                    info!(pending = self.stats.snapshot().pending(), "draining write-back queue");
                    if let Err(err) = task.await {
                        warn!(error = %err, "write-back worker ended abnormally");
                    }
                }
                ShutdownMode::Abandon => {
                    task.abort();
                    // Cancellation error is expected here
                    let _ = task.await;
                    let pending = self.stats.snapshot().pending();
                    if pending > 0 {
                        warn!(pending, "abandoning queued write-backs");
                    }
                    self.stats.record_abandoned(pending);
                }
            }
        }

        self.stats.snapshot()
    }
}

async fn run_loop(
    gateway: Arc<RemoteGateway>,
    mut rx: mpsc::Receiver<Queued>,
    tickets: Arc<Mutex<Tickets>>,
    stats: Arc<WriteBackStats>,
) {
    info!(backend = gateway.backend(), "write-back worker started");

    while let Some(Queued { ticket, job }) = rx.recv().await {
        if !lock_tickets(&tickets).is_current(&job.key, ticket) {
            debug!(key = %job.key, "write-back superseded, skipping");
            stats.record_skipped();
            continue;
        }

        match gateway.try_set(&job.key, &job.payload, job.ttl).await {
            Ok(()) => {
                debug!(key = %job.key, "write-back applied");
                stats.record_completed();
            }
            // Already logged by the gateway
            Err(_) => stats.record_failed(),
        }
        lock_tickets(&tickets).release(&job.key, ticket);
    }

    info!("write-back worker stopped");
}
