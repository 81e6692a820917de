//! anteroom-tuner — the dynamic rate controller.
//!
//! Consumes health verdicts and moves the live admission rate: a failed
//! check halves the rate, a passed check closes a quarter of the gap
//! back toward the deployed ceiling. The rate never leaves the
//! `1..=initial` band, and every adjustment is persisted so a restart
//! resumes from the last tuned value instead of the ceiling.

pub mod tuner;

pub use tuner::{RateTuner, TuneDecision, tune_down, tune_up};
