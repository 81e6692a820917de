//! Live admission rate shared across subsystems.
//!
//! The rate controller writes the current rate here; the fan-out trigger
//! reads it at the top of every scheduling tick. This stands in for the
//! original deployment's practice of rewriting the trigger's `RATE`
//! environment variable in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Cloneable handle to the live admission rate (admissions per tick).
#[derive(Debug, Clone)]
pub struct RateHandle(Arc<AtomicU32>);

impl RateHandle {
    /// Create a handle seeded with the deployed rate.
    pub fn new(initial: u32) -> Self {
        Self(Arc::new(AtomicU32::new(initial)))
    }

    /// Read the current rate.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// Replace the current rate.
    pub fn set(&self, rate: u32) {
        self.0.store(rate, Ordering::SeqCst);
    }
}
