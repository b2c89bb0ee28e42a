//! Per-job progress pubsub (§4.10): producers push typed counter events,
//! subscribers (an SSE-equivalent stream, or the job-state reducer) pull
//! from their own queue. Delivery is at-most-once — a lagging subscriber
//! drops the oldest events rather than stall the producer.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    EntitiesInserted { count: u64 },
    EntitiesUpdated { count: u64 },
    EntitiesSkipped { count: u64 },
    EntitiesFailed { count: u64 },
    EntitiesRemoved { count: u64 },
    AclReconciliationDone { removed: u64 },
    JobCompleted,
    JobFailed { error: String },
}

/// Process-wide registry of per-job progress channels. Producers and
/// subscribers both look the job up by id; the channel is created lazily on
/// first use and torn down when the job closes.
#[derive(Clone, Default)]
pub struct ProgressRegistry {
    channels: Arc<DashMap<Uuid, broadcast::Sender<ProgressEvent>>>,
}

pub struct ProgressSubscription {
    pub job_id: Uuid,
    receiver: broadcast::Receiver<ProgressEvent>,
}

impl ProgressSubscription {
    /// Await the next event. Returns `None` once the job has closed and no
    /// more events are buffered.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&self, job_id: Uuid) -> broadcast::Sender<ProgressEvent> {
        self.channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_QUEUE_CAPACITY).0)
            .clone()
    }

    /// Publish an event for `job_id`. A no-op if there are no subscribers.
    pub fn publish(&self, job_id: Uuid, event: ProgressEvent) {
        let sender = self.channel(job_id);
        let _ = sender.send(event);
    }

    /// Subscribe to `job_id`'s event stream.
    pub fn subscribe(&self, job_id: Uuid) -> ProgressSubscription {
        let sender = self.channel(job_id);
        ProgressSubscription { job_id, receiver: sender.subscribe() }
    }

    /// Idempotent: drop the channel for a finished job. Existing
    /// subscriptions still drain whatever was already queued, then see
    /// `recv() -> None`.
    pub fn close_job(&self, job_id: Uuid) {
        self.channels.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events_in_order() {
        let registry = ProgressRegistry::new();
        let job_id = Uuid::new_v4();
        let mut sub = registry.subscribe(job_id);

        registry.publish(job_id, ProgressEvent::EntitiesInserted { count: 3 });
        registry.publish(job_id, ProgressEvent::JobCompleted);

        assert!(matches!(sub.recv().await, Some(ProgressEvent::EntitiesInserted { count: 3 })));
        assert!(matches!(sub.recv().await, Some(ProgressEvent::JobCompleted)));
    }

    #[tokio::test]
    async fn close_job_is_idempotent() {
        let registry = ProgressRegistry::new();
        let job_id = Uuid::new_v4();
        registry.close_job(job_id);
        registry.close_job(job_id);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let registry = ProgressRegistry::new();
        registry.publish(Uuid::new_v4(), ProgressEvent::JobCompleted);
    }
}
