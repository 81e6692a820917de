//! Rate adjustment policy and its persistence.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use anteroom_core::RateHandle;
use anteroom_state::{AdmissionStore, StoreResult, TuneState};

/// What one controller cycle did to the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneDecision {
    /// Failed health check: rate halved.
    Down { from: u32, to: u32 },
    /// Passed health check: rate stepped back toward the ceiling.
    Up { from: u32, to: u32 },
    /// Passed at the ceiling (or at the floor after a fail) — no move.
    Held { at: u32 },
    /// Inside the minimum adjustment interval, nothing touched.
    Cooldown { at: u32 },
}

/// Halve the rate, rounding up, never below 1.
pub fn tune_down(current: u32) -> u32 {
    (((current as f64) * 0.5).ceil() as u32).max(1)
}

/// Close a quarter of the gap back toward `initial`, rounding up,
/// never above `initial`.
pub fn tune_up(current: u32, initial: u32) -> u32 {
    if current >= initial {
        return initial;
    }
    let stepped = (current as f64 + (initial - current) as f64 * 0.25).ceil() as u32;
    stepped.min(initial)
}

/// Applies health verdicts to the live rate and the persisted tune
/// record.
pub struct RateTuner {
    store: AdmissionStore,
    rate: RateHandle,
    /// Adjustments closer together than this are skipped.
    min_adjust_interval: Option<Duration>,
}

impl RateTuner {
    pub fn new(store: AdmissionStore, rate: RateHandle) -> Self {
        Self {
            store,
            rate,
            min_adjust_interval: None,
        }
    }

    pub fn with_min_adjust_interval(mut self, interval: Duration) -> Self {
        self.min_adjust_interval = Some(interval);
        self
    }

    /// Restore the live rate from the persisted tune record, if one
    /// exists. Called once at startup so a restart resumes from the
    /// last tuned value instead of the deployed ceiling.
    pub fn restore(&self) -> StoreResult<()> {
        if let Some(state) = self.store.get_tune()? {
            self.rate.set(state.current);
            info!(
                rate = state.current,
                ceiling = state.initial,
                "restored tuned rate"
            );
        }
        Ok(())
    }

    /// Apply one health verdict.
    ///
    /// The first call seeds the tune record with the live rate as the
    /// ceiling; later calls move `current` within `1..=initial` and
    /// keep the live rate handle in sync.
    pub fn apply(&self, passed: bool) -> StoreResult<TuneDecision> {
        let now = epoch_millis();
        let state = match self.store.get_tune()? {
            Some(state) => state,
            None => {
                let rate = self.rate.get();
                TuneState {
                    initial: rate,
                    current: rate,
                    last: 0,
                }
            }
        };

        if let Some(min) = self.min_adjust_interval
            && state.last > 0
            && now.saturating_sub(state.last) < min.as_millis() as u64
        {
            debug!(rate = state.current, "inside adjustment cooldown");
            return Ok(TuneDecision::Cooldown { at: state.current });
        }

        let next = if passed {
            tune_up(state.current, state.initial)
        } else {
            tune_down(state.current)
        };

        // `last` marks the most recent actual adjustment; a held rate
        // must not refresh it, or the cooldown would starve the next
        // real move.
        self.store.put_tune(&TuneState {
            initial: state.initial,
            current: next,
            last: if next == state.current { state.last } else { now },
        })?;
        self.rate.set(next);

        let decision = if next == state.current {
            TuneDecision::Held { at: next }
        } else if passed {
            info!(from = state.current, to = next, "rate tuned up");
            TuneDecision::Up {
                from: state.current,
                to: next,
            }
        } else {
            warn!(from = state.current, to = next, "rate tuned down");
            TuneDecision::Down {
                from: state.current,
                to: next,
            }
        };
        Ok(decision)
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
