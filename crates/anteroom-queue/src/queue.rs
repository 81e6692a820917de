//! In-process admission queue with SQS-style delivery semantics.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{QueueError, QueueResult};
use crate::message::{DeadLetter, QueueMessage};

/// Delivery semantics for a [`MemoryQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How long a received message stays invisible before redelivery.
    pub visibility_timeout: Duration,
    /// Deliveries before a message is diverted to the dead-letter buffer.
    pub max_receive_count: u32,
    /// Optional cap on queue depth; unbounded when `None`.
    pub max_depth: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            max_receive_count: 10,
            max_depth: None,
        }
    }
}

/// One enqueued message and its delivery bookkeeping.
struct Slot {
    id: String,
    body: String,
    receive_count: u32,
    /// When this message next becomes eligible for delivery.
    visible_at: Instant,
    /// Receipt handle of the most recent delivery, if any.
    receipt: Option<String>,
}

struct Inner {
    slots: VecDeque<Slot>,
    dead: Vec<DeadLetter>,
    closed: bool,
}

/// Thread-safe in-memory admission queue.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Mutex<Inner>>,
    config: QueueConfig,
}

impl MemoryQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slots: VecDeque::new(),
                dead: Vec::new(),
                closed: false,
            })),
            config,
        }
    }

    /// Enqueue one message body. Returns the assigned message id.
    pub fn send(&self, body: impl Into<String>) -> QueueResult<String> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        if let Some(max) = self.config.max_depth
            && inner.slots.len() >= max
        {
            return Err(QueueError::Full(max));
        }
        let id = format!("m-{:016x}", rand::rng().random::<u64>());
        inner.slots.push_back(Slot {
            id: id.clone(),
            body: body.into(),
            receive_count: 0,
            visible_at: Instant::now(),
            receipt: None,
        });
        debug!(%id, depth = inner.slots.len(), "message enqueued");
        Ok(id)
    }

    /// Receive up to `max` visible messages (short poll — returns
    /// immediately, possibly empty).
    ///
    /// Each delivered message becomes invisible for the visibility
    /// timeout and gets a fresh receipt handle. A visible message that
    /// has already been delivered `max_receive_count` times is diverted
    /// to the dead-letter buffer instead of being delivered again.
    pub fn receive(&self, max: usize) -> QueueResult<Vec<QueueMessage>> {
        let now = Instant::now();
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }

        let mut delivered = Vec::new();
        let mut exhausted: Vec<String> = Vec::new();
        let config = &self.config;

        for slot in inner.slots.iter_mut() {
            if delivered.len() >= max {
                break;
            }
            if slot.visible_at > now {
                continue;
            }
            if slot.receive_count >= config.max_receive_count {
                exhausted.push(slot.id.clone());
                continue;
            }
            slot.receive_count += 1;
            let receipt = format!("r-{:032x}", rand::rng().random::<u128>());
            slot.receipt = Some(receipt.clone());
            slot.visible_at = now + config.visibility_timeout;
            delivered.push(QueueMessage {
                id: slot.id.clone(),
                receipt_handle: receipt,
                body: slot.body.clone(),
                receive_count: slot.receive_count,
            });
        }

        // Redrive exhausted messages to the dead-letter buffer.
        for id in exhausted {
            if let Some(pos) = inner.slots.iter().position(|s| s.id == id)
                && let Some(slot) = inner.slots.remove(pos)
            {
                warn!(
                    id = %slot.id,
                    receive_count = slot.receive_count,
                    "delivery attempts exhausted, message moved to dead-letter buffer"
                );
                inner.dead.push(DeadLetter {
                    id: slot.id,
                    body: slot.body,
                    receive_count: slot.receive_count,
                });
            }
        }

        Ok(delivered)
    }

    /// Delete messages by receipt handle. A handle deletes only while it
    /// is the message's most recent one. Returns the number deleted.
    pub fn delete_batch(&self, receipts: &[String]) -> QueueResult<usize> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }
        let before = inner.slots.len();
        inner.slots.retain(|slot| {
            slot.receipt
                .as_ref()
                .is_none_or(|r| !receipts.contains(r))
        });
        let deleted = before - inner.slots.len();
        debug!(deleted, "messages deleted");
        Ok(deleted)
    }

    /// Messages currently held (visible or in flight), dead letters excluded.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages eligible for delivery right now.
    pub fn visible_len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .slots
            .iter()
            .filter(|s| s.visible_at <= now)
            .count()
    }

    /// Snapshot of the dead-letter buffer.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead.clone()
    }

    /// Refuse all further operations. Used to simulate an unavailable
    /// backing queue and for shutdown.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens if a holder panicked; propagate.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
