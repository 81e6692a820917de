//! The drain engine: queue → allow list, batch by batch.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

use anteroom_queue::{MemoryQueue, QueueError};
use anteroom_state::AllowListEntry;

use crate::sink::AllowSink;

/// Errors that end a processor invocation abnormally.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// What one invocation accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Completed drain cycles.
    pub cycles: u32,
    /// Tokens written to the allow list.
    pub admitted: u32,
    /// Queue messages deleted after a confirmed write.
    pub deleted: u32,
}

impl DrainReport {
    /// Fold another invocation's report into this one.
    pub fn merge(&mut self, other: DrainReport) {
        self.cycles += other.cycles;
        self.admitted += other.admitted;
        self.deleted += other.deleted;
    }
}

/// Drains the admission queue into an [`AllowSink`].
///
/// Stateless between invocations; safe to share behind an `Arc` and run
/// from many tasks at once — queue visibility semantics keep concurrent
/// invocations from seeing the same message.
pub struct Processor<S: AllowSink> {
    queue: MemoryQueue,
    sink: S,
    batch_size: usize,
    /// Hard wall-clock budget per invocation.
    budget: Duration,
}

impl<S: AllowSink> Processor<S> {
    pub fn new(queue: MemoryQueue, sink: S, batch_size: usize, budget: Duration) -> Self {
        Self {
            queue,
            sink,
            batch_size,
            budget,
        }
    }

    /// Run up to `iterations` drain cycles.
    ///
    /// Ends early when the queue yields nothing (no spinning), when the
    /// wall-clock budget is spent, or when an allow-list write fails —
    /// in the last case the batch's messages are left undeleted for
    /// natural redelivery after the visibility timeout.
    pub fn run(&self, iterations: u32) -> Result<DrainReport, ProcessorError> {
        let started = Instant::now();
        let mut report = DrainReport::default();

        for _ in 0..iterations {
            if started.elapsed() >= self.budget {
                debug!(
                    cycles = report.cycles,
                    "invocation budget spent, ending early"
                );
                break;
            }

            let messages = self.queue.receive(self.batch_size)?;
            if messages.is_empty() {
                debug!(cycles = report.cycles, "queue drained, ending early");
                break;
            }

            let admitted_at = epoch_millis();
            let entries: Vec<AllowListEntry> = messages
                .iter()
                .map(|m| AllowListEntry {
                    token: m.body.clone(),
                    allow: true,
                    admitted_at,
                })
                .collect();

            // Write before delete: on failure the whole batch stays in
            // the queue for redelivery. Duplicate admissions on retry
            // are idempotent by key.
            if let Err(e) = self.sink.admit_batch(&entries) {
                warn!(
                    error = %e,
                    batch = messages.len(),
                    "allow-list write failed, leaving batch for redelivery"
                );
                break;
            }
            report.admitted += entries.len() as u32;

            let receipts: Vec<String> = messages
                .into_iter()
                .map(|m| m.receipt_handle)
                .collect();
            report.deleted += self.queue.delete_batch(&receipts)? as u32;
            report.cycles += 1;
        }

        Ok(report)
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use anteroom_queue::QueueConfig;
    use anteroom_state::{AdmissionStore, StoreError};

    /// Sink that fails the first `fail_first` batches, then delegates.
    struct FlakySink {
        inner: AdmissionStore,
        fail_first: AtomicU32,
    }

    impl AllowSink for FlakySink {
        fn admit_batch(&self, entries: &[AllowListEntry]) -> Result<(), StoreError> {
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Write("injected failure".to_string()));
            }
            self.inner.admit_batch(entries)
        }
    }

    fn queue_with_visibility(ms: u64) -> MemoryQueue {
        MemoryQueue::new(QueueConfig {
            visibility_timeout: Duration::from_millis(ms),
            ..QueueConfig::default()
        })
    }

    fn processor(queue: &MemoryQueue, store: &AdmissionStore) -> Processor<AdmissionStore> {
        Processor::new(queue.clone(), store.clone(), 10, Duration::from_secs(30))
    }

    #[test]
    fn empty_queue_ends_invocation_immediately() {
        let queue = queue_with_visibility(1000);
        let store = AdmissionStore::open_in_memory().unwrap();

        let report = processor(&queue, &store).run(100).unwrap();

        assert_eq!(report, DrainReport::default());
    }

    #[test]
    fn drains_batch_into_allow_list_then_deletes() {
        let queue = queue_with_visibility(1000);
        let store = AdmissionStore::open_in_memory().unwrap();
        for i in 0..7 {
            queue.send(format!("tok-{i}")).unwrap();
        }

        let report = processor(&queue, &store).run(5).unwrap();

        assert_eq!(report.admitted, 7);
        assert_eq!(report.deleted, 7);
        assert_eq!(report.cycles, 1);
        assert!(queue.is_empty());
        let entry = store.get_entry("tok-3").unwrap().unwrap();
        assert!(entry.allow);
    }

    #[test]
    fn iterations_bound_caps_throughput() {
        let queue = queue_with_visibility(1000);
        let store = AdmissionStore::open_in_memory().unwrap();
        for i in 0..25 {
            queue.send(format!("tok-{i}")).unwrap();
        }

        // 2 cycles x batch 10 = at most 20 admissions this invocation.
        let report = processor(&queue, &store).run(2).unwrap();

        assert_eq!(report.admitted, 20);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn write_failure_leaves_messages_in_queue() {
        let queue = queue_with_visibility(20);
        let store = AdmissionStore::open_in_memory().unwrap();
        for i in 0..5 {
            queue.send(format!("tok-{i}")).unwrap();
        }

        let sink = FlakySink {
            inner: store.clone(),
            fail_first: AtomicU32::new(1),
        };
        let proc = Processor::new(queue.clone(), sink, 10, Duration::from_secs(30));

        let report = proc.run(10).unwrap();
        assert_eq!(report.admitted, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.count_entries().unwrap(), 0);
        // Nothing was deleted — the batch is in flight, not lost.
        assert_eq!(queue.len(), 5);

        // After the visibility timeout the batch is redelivered and the
        // now-healthy sink admits every token.
        std::thread::sleep(Duration::from_millis(40));
        let report = proc.run(10).unwrap();
        assert_eq!(report.admitted, 5);
        assert!(queue.is_empty());
        assert_eq!(store.count_entries().unwrap(), 5);
    }

    #[test]
    fn redelivered_duplicate_admission_is_idempotent() {
        let queue = queue_with_visibility(10);
        let store = AdmissionStore::open_in_memory().unwrap();
        queue.send("tok-1").unwrap();

        let proc = processor(&queue, &store);
        proc.run(1).unwrap();
        let first = store.get_entry("tok-1").unwrap().unwrap();

        // Simulate a redelivered duplicate of an already-admitted token.
        queue.send("tok-1").unwrap();
        proc.run(1).unwrap();

        assert_eq!(store.count_entries().unwrap(), 1);
        let second = store.get_entry("tok-1").unwrap().unwrap();
        assert!(second.allow);
        assert!(second.admitted_at >= first.admitted_at);
    }

    #[test]
    fn zero_budget_runs_no_cycles() {
        let queue = queue_with_visibility(1000);
        let store = AdmissionStore::open_in_memory().unwrap();
        queue.send("tok-1").unwrap();

        let proc = Processor::new(queue.clone(), store, 10, Duration::ZERO);
        let report = proc.run(10).unwrap();

        assert_eq!(report.cycles, 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn closed_queue_surfaces_error() {
        let queue = queue_with_visibility(1000);
        let store = AdmissionStore::open_in_memory().unwrap();
        queue.close();

        let err = processor(&queue, &store).run(1).unwrap_err();
        assert!(matches!(err, ProcessorError::Queue(QueueError::Closed)));
    }
}
