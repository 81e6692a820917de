//! anteroom-state — embedded allow-list store for the waiting room.
//!
//! Backed by [redb](https://docs.rs/redb), holds everything that must
//! survive across stateless invocations: the allow list (admitted tokens)
//! and the two singleton control records (latency baseline and rate
//! controller state).
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! The allow list is keyed by admission token; the control table holds
//! exactly two well-known keys, `baseline` and `tune`.
//!
//! The `AdmissionStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::AdmissionStore;
pub use types::*;
