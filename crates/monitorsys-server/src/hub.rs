/// Snapshot fan-out to WebSocket subscribers.
///
/// The hub owns the single collector and the subscriber set. Each tick it
/// captures the current subscribers, collects one snapshot, serializes it
/// once and offers it to every captured subscriber with `try_send`, so a
/// stalled or dead client never blocks the others. Subscribers whose
/// delivery failed are removed in one `retain` pass afterwards; they are
/// never retried.
///
/// With no subscribers a tick does no collection at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use monitorsys_protocol::snapshot::Snapshot;

use crate::collector::MetricsCollector;

pub type SubscriberId = u64;

/// Serialized snapshot shared by every subscriber of one tick.
pub type Payload = Arc<str>;

/// Receiving end handed to a connection task.
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<Payload>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

impl TickOutcome {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.dropped == 0
    }
}

pub struct BroadcastHub {
    collector: Mutex<MetricsCollector>,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Payload>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(collector: MetricsCollector, buffer: usize) -> Self {
        Self {
            collector: Mutex::new(collector),
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        let count = {
            let mut subs = self.lock_subscribers();
            subs.insert(id, tx);
            subs.len()
        };
        debug!(subscriber = id, subscribers = count, "subscriber added");
        Subscription { id, rx }
    }

    /// Remove a subscriber. Removing an unknown id is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.lock_subscribers().remove(&id).is_some() {
            debug!(subscriber = id, "subscriber removed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    /// Collect one snapshot for the pull endpoint.
    pub fn snapshot(&self) -> Snapshot {
        self.lock_collector().collect()
    }

    /// One collect-and-broadcast cycle.
    pub fn tick(&self) -> TickOutcome {
        // Capture before collecting: later joiners wait for the next tick
        let targets: Vec<(SubscriberId, mpsc::Sender<Payload>)> = {
            let subs = self.lock_subscribers();
            if subs.is_empty() {
                return TickOutcome::idle();
            }
            subs.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let snapshot = self.lock_collector().collect();
        let payload: Payload = match snapshot.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "Failed to serialize snapshot");
                return TickOutcome::idle();
            }
        };

        let mut failed = Vec::new();
        for (id, tx) in &targets {
            if let Err(e) = tx.try_send(payload.clone()) {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "lagging",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                debug!(subscriber = id, reason, "delivery failed, dropping subscriber");
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            self.lock_subscribers().retain(|id, _| !failed.contains(id));
        }

        TickOutcome {
            delivered: targets.len() - failed.len(),
            dropped: failed.len(),
        }
    }

    /// Release the collector's GPU capability.
    pub fn shutdown(&self) {
        self.lock_collector().shutdown();
    }

    fn lock_collector(&self) -> MutexGuard<'_, MetricsCollector> {
        self.collector.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Payload>>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
