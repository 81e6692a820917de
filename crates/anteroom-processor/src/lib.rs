//! anteroom-processor — the admission processor.
//!
//! Each invocation runs a bounded number of drain cycles: receive a batch
//! of pending tokens from the admission queue, write them into the allow
//! list as one durable batch, then delete the consumed messages. The
//! write-before-delete ordering is the correctness-critical invariant —
//! a message may only leave the queue once its token is durably admitted.

pub mod processor;
pub mod sink;

pub use processor::{DrainReport, Processor, ProcessorError};
pub use sink::AllowSink;
