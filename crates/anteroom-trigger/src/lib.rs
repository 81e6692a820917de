//! anteroom-trigger — the fan-out trigger.
//!
//! One processor invocation can run only a bounded number of drain
//! cycles, so a single invocation tops out at
//! `max_iterations_per_call x batch_size` admissions. To realize a
//! higher rate the trigger splits each scheduling tick's target into
//! several concurrent invocations, capped by a semaphore standing in
//! for reserved concurrency.
//!
//! The tick loop reads the live rate from [`anteroom_core::RateHandle`]
//! on every tick, which is how the rate controller's adjustments take
//! effect.

pub mod plan;
pub mod trigger;

pub use plan::plan_invocations;
pub use trigger::FanoutTrigger;
