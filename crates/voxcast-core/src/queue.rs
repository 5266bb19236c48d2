//! Bounded FIFO hand-off between the generation and playback stages.
//!
//! The queue is the sole coupling between the irregular-latency generation
//! stage and the fixed-rate playback stage. Bounding it caps memory and
//! caps how far generation can run ahead of the audio device.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Create a bounded queue of the given capacity.
///
/// Capacity must be at least 1; values outside 1..=50 are clamped.
pub fn bounded<T>(capacity: usize) -> (ContentSender<T>, ContentReceiver<T>) {
    let capacity = capacity.clamp(1, 50);
    let (tx, rx) = mpsc::channel(capacity);
    (ContentSender { tx }, ContentReceiver { rx })
}

/// Outcome of a [`ContentSender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The item was enqueued.
    Queued,
    /// Shutdown was signaled (or the consumer is gone); the item was dropped.
    Shutdown,
}

/// Outcome of a [`ContentReceiver::pop`].
#[derive(Debug)]
pub enum Popped<T> {
    Unit(T),
    TimedOut,
    /// The producer side has been dropped and the queue is empty.
    Closed,
}

/// Producer half of the queue (single producer in this pipeline).
#[derive(Debug)]
pub struct ContentSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T: Send> ContentSender<T> {
    /// Enqueue an item, waiting while the queue is full.
    ///
    /// Returns [`PushOutcome::Shutdown`] without enqueuing once the
    /// cancellation token fires, so a producer blocked on a full queue
    /// never outlives a stop request.
    pub async fn push(&self, item: T, cancel: &CancellationToken) -> PushOutcome {
        tokio::select! {
            _ = cancel.cancelled() => PushOutcome::Shutdown,
            res = self.tx.send(item) => match res {
                Ok(()) => PushOutcome::Queued,
                Err(_) => PushOutcome::Shutdown,
            },
        }
    }
}

/// Consumer half of the queue (single consumer — FIFO order is preserved).
#[derive(Debug)]
pub struct ContentReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> ContentReceiver<T> {
    /// Dequeue the next item, waiting up to `timeout`.
    ///
    /// A timeout is not an error; the caller is expected to re-check its
    /// stop signal and poll again.
    pub async fn pop(&mut self, timeout: Duration) -> Popped<T> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(item)) => Popped::Unit(item),
            Ok(None) => Popped::Closed,
            Err(_) => Popped::TimedOut,
        }
    }

    /// Discard everything currently queued. Used only during shutdown.
    pub fn drain(&mut self) -> usize {
        let mut discarded = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) => discarded += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        discarded
    }
}
