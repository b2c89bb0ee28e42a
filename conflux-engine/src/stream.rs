//! The bounded, back-pressured buffer between a source's generator and the
//! orchestrator's worker pool (§4.4).

use crate::source::{Source, SourceError};
use conflux_core::entity::Entity;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

pub type StreamItem = Result<Box<dyn Entity>, SourceError>;

/// Single producer task draining `source.generate_entities()` into a
/// bounded channel; multiple workers pull from `recv()`. Dropping the
/// stream cancels the producer and releases the buffer on every exit path,
/// including panic and early return — no separate "close" call is needed to
/// avoid a leak.
pub struct AsyncSourceStream {
    receiver: mpsc::Receiver<StreamItem>,
    producer: JoinHandle<()>,
    cancel: CancellationToken,
}

impl AsyncSourceStream {
    /// Capacity matches `STREAM_BUFFER` (default 256, §4.4).
    pub fn open(source: Arc<dyn Source>, capacity: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let producer_cancel = cancel.clone();

        let producer = tokio::spawn(async move {
            let mut entities = source.generate_entities();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = producer_cancel.cancelled() => break,
                    item = entities.next() => item,
                };
                match next {
                    Some(item) => {
                        let is_err = item.is_err();
                        if tx.send(item).await.is_err() {
                            // No consumers left; stop draining the source.
                            break;
                        }
                        if is_err {
                            // A generator error is fatal: stop producing
                            // once it's been handed to consumers to drain.
                            break;
                        }
                    }
                    None => break,
                }
            }
        });

        Self { receiver: rx, producer, cancel }
    }

    /// Pull the next item. `None` means the source finished or the stream
    /// was cancelled and fully drained.
    pub async fn recv(&mut self) -> Option<StreamItem> {
        self.receiver.recv().await
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for AsyncSourceStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.producer.abort();
    }
}
