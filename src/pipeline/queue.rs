//! The two bounded queues between pipeline stages.
//!
//! [`FrameQueue`] never blocks its producer: a full queue loses its oldest
//! frame. [`CommandSender`] never loses a command: a full queue blocks the
//! producer with a timeout, retried once, and then reports a stall.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Notify};
use tracing::warn;

use crate::error::PipelineError;
use crate::model::Command;

struct FrameSlots<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct FrameQueueInner<T> {
    slots: Mutex<FrameSlots<T>>,
    ready: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

/// Single-producer single-consumer drop-oldest queue.
pub struct FrameQueue<T> {
    inner: Arc<FrameQueueInner<T>>,
}

impl<T> Clone for FrameQueue<T> {
    fn clone(&self) -> Self {
        FrameQueue { inner: Arc::clone(&self.inner) }
    }
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        FrameQueue {
            inner: Arc::new(FrameQueueInner {
                slots: Mutex::new(FrameSlots { items: VecDeque::with_capacity(capacity), closed: false }),
                ready: Notify::new(),
                capacity,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// push enqueues without ever waiting.
    ///
    /// # Arguments
    /// * `item` - frame to enqueue
    ///
    /// # Returns
    /// * `Option<T>` - the frame that was discarded to make room, or `item`
    ///   itself if the queue is already closed
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut slots = self.inner.slots.lock();
            if slots.closed {
                return Some(item);
            }
            let evicted = if slots.items.len() >= self.inner.capacity {
                slots.items.pop_front()
            } else {
                None
            };
            slots.items.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.ready.notify_one();
        evicted
    }

    /// pop waits for the oldest frame.
    ///
    /// Cancel safe: a frame is only removed when this returns it.
    ///
    /// # Returns
    /// * `Option<T>` - `None` once the queue is closed and drained
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.inner.ready.notified();
            {
                let mut slots = self.inner.slots.lock();
                if let Some(item) = slots.items.pop_front() {
                    return Some(item);
                }
                if slots.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Rejects further pushes; the consumer still drains what is queued.
    pub fn close(&self) {
        self.inner.slots.lock().closed = true;
        self.inner.ready.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slots.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.slots.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Frames discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// command_queue creates the processing → dispatch queue.
///
/// # Arguments
/// * `capacity` - commands held before the producer blocks
/// * `send_timeout` - how long one send attempt may block
///
/// # Returns
/// * `(CommandSender, CommandReceiver)`
pub fn command_queue(capacity: usize, send_timeout: Duration) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandSender { tx, send_timeout }, CommandReceiver { rx })
}

/// Outcome of a successful [`CommandSender::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The dispatch stage is gone; the command was discarded.
    Closed,
}

pub struct CommandSender {
    tx: mpsc::Sender<Command>,
    send_timeout: Duration,
}

impl CommandSender {
    /// send blocks while the queue is full, for at most two timeouts.
    ///
    /// # Arguments
    /// * `command` - processed frame
    ///
    /// # Returns
    /// * `Result<Delivery, PipelineError>` - `CommandQueueStalled` after the
    ///   retry also times out
    pub async fn send(&self, command: Command) -> Result<Delivery, PipelineError> {
        let sequence = command.sequence;
        let command = match self.tx.send_timeout(command, self.send_timeout).await {
            Ok(()) => return Ok(Delivery::Queued),
            Err(SendTimeoutError::Closed(_)) => return Ok(Delivery::Closed),
            Err(SendTimeoutError::Timeout(command)) => command,
        };

        warn!(sequence, timeout = ?self.send_timeout, "command queue full, retrying once");
        match self.tx.send_timeout(command, self.send_timeout).await {
            Ok(()) => Ok(Delivery::Queued),
            Err(SendTimeoutError::Closed(_)) => Ok(Delivery::Closed),
            Err(SendTimeoutError::Timeout(_)) => Err(PipelineError::CommandQueueStalled {
                timeout_ms: self.send_timeout.as_millis() as u64,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
}

impl CommandReceiver {
    /// Next command in FIFO order; `None` once the sender is dropped and
    /// the queue drained.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
