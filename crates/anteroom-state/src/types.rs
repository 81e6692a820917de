//! Domain types persisted by the anteroom store.

use serde::{Deserialize, Serialize};

/// Opaque identifier for one waiting visitor session.
pub type AdmissionToken = String;

/// One admitted token. Created exactly once by the processor, never
/// mutated; absence of an entry means "not yet admitted".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowListEntry {
    pub token: AdmissionToken,
    /// Always true once the record exists.
    pub allow: bool,
    /// Unix timestamp (milliseconds) of admission.
    pub admitted_at: u64,
}

/// Latency baseline captured on the health prober's first run and used
/// as the statistical reference point for every later health check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BaselineStats {
    /// Sample mean latency in milliseconds.
    pub mean: f64,
    /// Sample standard deviation (divisor N-1) in milliseconds.
    pub std_dev: f64,
}

/// Rate controller state. `initial` is the deployed ceiling captured at
/// first run; `current` is the live admission rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TuneState {
    pub initial: u32,
    pub current: u32,
    /// Unix timestamp (milliseconds) of the most recent adjustment.
    pub last: u64,
}
