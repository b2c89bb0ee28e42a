//! Bounded worker-pool executor: one producer feeds a bounded channel, a
//! fixed number of workers drain it concurrently. Used by the orchestrator
//! to process entities under `MAX_WORKERS` concurrency (§4.5, §5) without an
//! unbounded task-per-entity fan-out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A pool of `worker_count` tasks consuming from one bounded channel.
///
/// Submitting blocks once the channel is full, which is the back-pressure
/// mechanism: a slow set of workers (e.g. waiting on destination I/O)
/// naturally stalls the producer instead of buffering unboundedly.
pub struct WorkerPool<T> {
    sender: Option<mpsc::Sender<T>>,
    cancel: CancellationToken,
    workers: JoinSet<()>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `worker_count` workers reading from a channel of capacity
    /// `buffer`, each processing items with `handler`.
    pub fn spawn<F, Fut>(worker_count: usize, buffer: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(buffer);
        let receiver = Arc::new(Mutex::new(receiver));
        let cancel = CancellationToken::new();
        let handler = Arc::new(handler);
        let mut workers = JoinSet::new();

        for _ in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            let cancel = cancel.clone();
            let handler = handler.clone();
            workers.spawn(async move {
                loop {
                    let next = {
                        let mut guard = receiver.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            item = guard.recv() => item,
                        }
                    };
                    match next {
                        Some(item) => handler(item).await,
                        None => break,
                    }
                }
            });
        }

        Self { sender: Some(sender), cancel, workers }
    }

    /// Hand an item to the pool, awaiting a free channel slot.
    ///
    /// Returns `Err` with the item back if the pool has already been shut
    /// down or cancelled.
    pub async fn submit(&self, item: T) -> Result<(), T> {
        match &self.sender {
            Some(sender) => sender.send(item).await.map_err(|e| e.0),
            None => Err(item),
        }
    }

    /// A token the caller can cancel to stop workers mid-drain — used when
    /// a job is cancelled and in-flight items should be abandoned rather
    /// than processed to completion.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Close the submission side so workers drain whatever is queued and
    /// then exit, waiting up to `grace` for them to finish. Workers still
    /// running past the grace period are cancelled and abandoned.
    pub async fn shutdown(mut self, grace: Duration) {
        self.sender.take();
        let drained = tokio::time::timeout(grace, async {
            while self.workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!("worker pool did not drain within grace period, cancelling");
            self.cancel.cancel();
            while self.workers.join_next().await.is_some() {}
        }
    }
}
