//! anteroom-queue — the embedded admission queue.
//!
//! Holds pending admission tokens between the gate (producer) and the
//! processor (consumer) with the delivery semantics the waiting room
//! depends on:
//!
//! - at-least-once delivery: a received message becomes invisible for the
//!   visibility timeout and reappears unless deleted
//! - receipt handles: rotated on every delivery; only the latest handle
//!   can delete a message
//! - dead-letter redrive: a message delivered `max_receive_count` times
//!   without deletion is diverted to an internal dead-letter buffer
//!
//! Within a visibility window a message is delivered to at most one
//! receiver, which is what lets many processor invocations drain the
//! same queue concurrently.

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::{DeadLetter, QueueMessage};
pub use queue::{MemoryQueue, QueueConfig};
