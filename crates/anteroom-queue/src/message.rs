//! Message types delivered by the admission queue.

/// One delivered message: an admission token plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Stable message id, assigned at enqueue.
    pub id: String,
    /// Handle for this delivery; superseded by any later delivery.
    pub receipt_handle: String,
    /// The admission token.
    pub body: String,
    /// How many times this message has been delivered, this one included.
    pub receive_count: u32,
}

/// A message diverted after exhausting its delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub id: String,
    pub body: String,
    pub receive_count: u32,
}
