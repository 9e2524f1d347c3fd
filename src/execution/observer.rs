use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted while batches are dispatched.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    RunStarted,
    BatchStarted { batch: usize, row_count: usize },
    RateGateWaited { duration: Duration },
    BatchFinished { batch: usize, output_rows: usize },
    RunFinished {
        elapsed: Duration,
        metrics: DispatchMetricsSnapshot,
    },
}

/// Observer hook for batch events.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}

/// A simple stderr logger for batch events.
#[derive(Default)]
pub struct StdErrBatchObserver;

impl BatchObserver for StdErrBatchObserver {
    fn on_event(&self, event: &BatchEvent) {
        eprintln!("{event:?}");
    }
}

/// Live counters for a transform's dispatcher.
///
/// Workers update these while a batch runs; callers can snapshot them at any time.
pub struct DispatchMetrics {
    rows_processed: AtomicU64,
    rows_failed: AtomicU64,
    batches_started: AtomicU64,
    batches_finished: AtomicU64,
    gate_wait_ns: AtomicU64,

    active_rows: AtomicUsize,
    max_active_rows: AtomicUsize,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            rows_processed: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            batches_started: AtomicU64::new(0),
            batches_finished: AtomicU64::new(0),
            gate_wait_ns: AtomicU64::new(0),
            active_rows: AtomicUsize::new(0),
            max_active_rows: AtomicUsize::new(0),
        }
    }

    pub fn on_batch_start(&self) {
        let _ = self.batches_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_batch_end(&self) {
        let _ = self.batches_finished.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_row_start(&self) {
        let now = self.active_rows.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_rows.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_row_end(&self) {
        let _ = self.rows_processed.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_rows.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_row_failed(&self) {
        let _ = self.rows_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_gate_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.gate_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            rows_failed: self.rows_failed.load(Ordering::SeqCst),
            batches_started: self.batches_started.load(Ordering::SeqCst),
            batches_finished: self.batches_finished.load(Ordering::SeqCst),
            gate_wait: Duration::from_nanos(self.gate_wait_ns.load(Ordering::SeqCst)),
            max_active_rows: self.max_active_rows.load(Ordering::SeqCst),
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of [`DispatchMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub rows_processed: u64,
    pub rows_failed: u64,
    pub batches_started: u64,
    pub batches_finished: u64,
    pub gate_wait: Duration,
    pub max_active_rows: usize,
}

impl fmt::Display for DispatchMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows_processed={}, rows_failed={}, batches={}/{}, max_active_rows={}, gate_wait={:?}",
            self.rows_processed,
            self.rows_failed,
            self.batches_finished,
            self.batches_started,
            self.max_active_rows,
            self.gate_wait
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::DispatchMetrics;

    #[test]
    fn tracks_peak_active_rows_and_gate_wait() {
        let m = DispatchMetrics::new();
        m.on_row_start();
        m.on_row_start();
        m.on_row_start();
        m.on_row_end();
        m.on_row_start();
        m.on_row_end();
        m.on_gate_wait(Duration::from_millis(3));
        m.on_gate_wait(Duration::from_millis(4));

        let snap = m.snapshot();
        assert_eq!(snap.max_active_rows, 3);
        assert_eq!(snap.rows_processed, 2);
        assert_eq!(snap.gate_wait, Duration::from_millis(7));
    }
}
