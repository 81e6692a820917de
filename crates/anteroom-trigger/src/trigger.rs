//! The tick loop: dispatch planned invocations concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use anteroom_core::RateHandle;
use anteroom_processor::{AllowSink, DrainReport, Processor};

use crate::plan::plan_invocations;

/// Dispatches processor invocations at every scheduling tick.
pub struct FanoutTrigger<S: AllowSink + 'static> {
    processor: Arc<Processor<S>>,
    rate: RateHandle,
    batch_size: u32,
    max_iterations_per_call: u32,
    /// Reserved-concurrency analog: caps simultaneous invocations.
    concurrency: Arc<Semaphore>,
}

impl<S: AllowSink + 'static> FanoutTrigger<S> {
    pub fn new(
        processor: Arc<Processor<S>>,
        rate: RateHandle,
        batch_size: u32,
        max_iterations_per_call: u32,
        max_concurrency: usize,
    ) -> Self {
        Self {
            processor,
            rate,
            batch_size,
            max_iterations_per_call,
            concurrency: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Run one scheduling tick: plan invocations for the live rate and
    /// dispatch them as concurrent tasks, waiting for all to finish.
    pub async fn tick(&self) -> anyhow::Result<DrainReport> {
        let rate = self.rate.get();
        let plan = plan_invocations(rate, self.batch_size, self.max_iterations_per_call);
        debug!(rate, invocations = plan.len(), "tick planned");

        let mut handles = Vec::with_capacity(plan.len());
        for iterations in plan {
            let permit = self
                .concurrency
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| anyhow::anyhow!("concurrency semaphore closed: {e}"))?;
            let processor = self.processor.clone();
            // Drain cycles are synchronous (mutex + redb transactions),
            // so keep them off the async worker threads.
            handles.push(tokio::task::spawn_blocking(move || {
                let report = processor.run(iterations);
                drop(permit);
                report
            }));
        }

        let mut total = DrainReport::default();
        for handle in handles {
            match handle.await {
                Ok(Ok(report)) => total.merge(report),
                Ok(Err(e)) => warn!(error = %e, "processor invocation failed"),
                Err(e) => warn!(error = %e, "processor task panicked"),
            }
        }
        debug!(
            admitted = total.admitted,
            cycles = total.cycles,
            "tick complete"
        );
        Ok(total)
    }

    /// Run the trigger loop until shutdown.
    pub async fn run(self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "fan-out trigger started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "trigger tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("fan-out trigger shutting down");
                    break;
                }
            }
        }
    }
}
