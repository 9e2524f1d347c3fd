//! Batch dispatch: fixed-size batches, rate-gated parallel row execution.
//!
//! This module sits between the transforms and the worker pool and provides:
//!
//! - [`BatchDispatcher`]: runs one batch of rows on a bounded rayon pool, every row first
//!   passing the shared [`RateGate`]
//! - [`Batches`]: the lazy iterator a host pulls transformed rows from
//! - metrics + observer hooks for monitoring

mod observer;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{TransformError, TransformResult};
use crate::logging::TransformLogger;
use crate::rate_gate::RateGate;
use crate::transform::RowTransform;
use crate::types::Row;

pub use observer::{
    BatchEvent, BatchObserver, DispatchMetrics, DispatchMetricsSnapshot, StdErrBatchObserver,
};

/// Worker cap used when the operation does not set `max-workers`.
pub const MAX_DEFAULT_WORKERS: usize = 32;

/// Configuration for the [`BatchDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Rows per batch.
    pub batch_size: usize,
    /// Number of worker threads.
    ///
    /// If `None`, uses `min(batch_size, MAX_DEFAULT_WORKERS)`.
    pub num_threads: Option<usize>,
}

/// Runs batches of rows concurrently behind a shared rate gate.
pub struct BatchDispatcher {
    pool: ThreadPool,
    gate: Arc<RateGate>,
    batch_size: usize,
    logger: Arc<dyn TransformLogger>,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<DispatchMetrics>,
    batches: AtomicUsize,
}

impl BatchDispatcher {
    /// Create a dispatcher.
    ///
    /// Fails if `batch_size == 0`, `num_threads == Some(0)`, or the pool cannot be built.
    pub fn new(
        gate: Arc<RateGate>,
        opts: DispatchOptions,
        logger: Arc<dyn TransformLogger>,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> TransformResult<Self> {
        if opts.batch_size == 0 {
            return Err(TransformError::configuration("batch size must be > 0"));
        }
        if opts.num_threads == Some(0) {
            return Err(TransformError::configuration(
                "max workers must be > 0 when set",
            ));
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| opts.batch_size.min(MAX_DEFAULT_WORKERS))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("geocode-worker-{i}"))
            .build()?;

        Ok(Self {
            pool,
            gate,
            batch_size: opts.batch_size,
            logger,
            observer,
            metrics: Arc::new(DispatchMetrics::new()),
            batches: AtomicUsize::new(0),
        })
    }

    /// Rows per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// The shared rate gate.
    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    /// Get a handle to real-time dispatch metrics.
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run `op` over every row of `batch` concurrently and return all rows once every one of
    /// them has completed.
    ///
    /// Each row first waits on the rate gate. A row whose wait fails is reported and returned
    /// unchanged. The order of the returned rows is not part of the contract.
    pub fn dispatch<F>(&self, batch: Vec<Row>, op: F) -> Vec<Row>
    where
        F: Fn(Row) -> Row + Send + Sync,
    {
        self.dispatch_checked(batch, |_| Ok(()), op)
    }

    /// Like [`BatchDispatcher::dispatch`], but rows rejected by `check` are reported and
    /// returned unchanged without taking a rate-gate slot.
    pub fn dispatch_checked<C, F>(&self, batch: Vec<Row>, check: C, op: F) -> Vec<Row>
    where
        C: Fn(&Row) -> TransformResult<()> + Send + Sync,
        F: Fn(Row) -> Row + Send + Sync,
    {
        let index = self.batches.fetch_add(1, Ordering::SeqCst);
        let row_count = batch.len();
        self.metrics.on_batch_start();
        self.emit(BatchEvent::BatchStarted {
            batch: index,
            row_count,
        });

        let out: Vec<Row> = self.pool.install(|| {
            batch
                .into_par_iter()
                .map(|row| self.run_row(row, &check, &op))
                .collect()
        });

        self.emit(BatchEvent::BatchFinished {
            batch: index,
            output_rows: out.len(),
        });
        self.metrics.on_batch_end();
        out
    }

    /// Count and report a row that could not be processed.
    pub fn report_failure(&self, message: &str) {
        self.metrics.on_row_failed();
        self.logger.error(message);
    }

    fn run_row<C, F>(&self, row: Row, check: &C, op: &F) -> Row
    where
        C: Fn(&Row) -> TransformResult<()> + Sync,
        F: Fn(Row) -> Row + Sync,
    {
        if let Err(e) = check(&row) {
            self.report_failure(&e.to_string());
            return row;
        }

        match self.gate.wait_to_proceed() {
            Ok(waited) => {
                if waited > Duration::ZERO {
                    self.metrics.on_gate_wait(waited);
                    self.emit(BatchEvent::RateGateWaited { duration: waited });
                }
            }
            Err(e) => {
                self.report_failure(&e.to_string());
                return row;
            }
        }

        self.metrics.on_row_start();
        let out = op(row);
        self.metrics.on_row_end();
        out
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// Transformed rows, produced one batch at a time.
///
/// A batch is pulled from the source only after every row of the previous batch has been
/// yielded, so batch N is always emitted in full before any row of batch N+1. Dropping the
/// iterator stops further batches from starting.
pub struct Batches<'a, I> {
    transform: &'a dyn RowTransform,
    source: I,
    current: std::vec::IntoIter<Row>,
    started_at: Option<Instant>,
    done: bool,
}

impl<'a, I> Batches<'a, I>
where
    I: Iterator<Item = Row>,
{
    /// Batch `source` through `transform`.
    pub fn new(transform: &'a dyn RowTransform, source: I) -> Self {
        Self {
            transform,
            source,
            current: Vec::new().into_iter(),
            started_at: None,
            done: false,
        }
    }
}

impl<I> Iterator for Batches<'_, I>
where
    I: Iterator<Item = Row>,
{
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        loop {
            if let Some(row) = self.current.next() {
                return Some(row);
            }
            if self.done {
                return None;
            }

            let transform = self.transform;
            let Some(dispatcher) = transform.dispatcher() else {
                self.done = true;
                return None;
            };
            let started_at = *self.started_at.get_or_insert_with(|| {
                dispatcher.emit(BatchEvent::RunStarted);
                Instant::now()
            });

            let batch: Vec<Row> = self
                .source
                .by_ref()
                .take(dispatcher.batch_size())
                .collect();
            if batch.is_empty() {
                self.done = true;
                dispatcher.emit(BatchEvent::RunFinished {
                    elapsed: started_at.elapsed(),
                    metrics: dispatcher.metrics.snapshot(),
                });
                return None;
            }

            self.current = dispatcher
                .dispatch_checked(
                    batch,
                    |row| transform.check_row(row),
                    |row| transform.operate(row),
                )
                .into_iter();
        }
    }
}
