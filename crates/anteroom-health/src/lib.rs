//! anteroom-health — latency probing against the protected endpoint.
//!
//! On its first run the prober captures a latency baseline (sample mean
//! and standard deviation over N timed requests) and persists it. Every
//! later run takes a fresh sample and classifies it against the
//! three-sigma control limit `baseline.mean + 3 x baseline.std_dev`;
//! the pass/fail verdict feeds the rate controller.
//!
//! The baseline is deliberately never recomputed — a stable reference
//! point beats one that drifts along with a degrading backend. Deleting
//! the `baseline` control record forces a recapture on the next cycle.

pub mod prober;
pub mod stats;

pub use prober::{HealthProber, ProbeVerdict};
pub use stats::{SampleStats, sample_stats, within_limit};
