//! Streamed run output
//!
//! A [`BulkStream`] drains the run accumulator per batch: each batch's
//! records, then its errors, then (when requested) its notifications are
//! yielded in processing order. Two shapes back it:
//! - sequential: one batch is processed per consumer pull
//! - concurrent: the worker pool runs ahead behind a bounded channel, so
//!   consumption stays demand-paced with a bounded prefetch window
//!
//! Dropping a concurrent stream signals the run's abort flag; workers
//! observe it (or the closed channel) and wind down.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use scythe_core::{BulkResult, StreamItem};
use scythe_engine::TransactionCoordinator;

use crate::accumulator::WorkerOutcome;
use crate::batch::process_batch;
use crate::context::RunContext;
use crate::coordinator::worker_loop;
use crate::partition::BatchEntry;

/// A lazily-consumed bulk run
pub struct BulkStream {
    inner: Inner,
    buffer: VecDeque<StreamItem>,
}

enum Inner {
    /// Pre-computed items (atomic path collapsed into a stream)
    Ready,
    Sequential {
        ctx: Arc<RunContext>,
        txn: Box<TransactionCoordinator>,
        batches: Box<dyn Iterator<Item = Vec<BatchEntry>> + Send>,
    },
    Concurrent {
        ctx: Arc<RunContext>,
        out_rx: mpsc::Receiver<WorkerOutcome>,
    },
}

impl BulkStream {
    /// Process one batch per pull on the consumer's thread
    pub(crate) fn sequential(
        ctx: Arc<RunContext>,
        batches: Box<dyn Iterator<Item = Vec<BatchEntry>> + Send>,
    ) -> Self {
        let txn = Box::new(ctx.new_transaction_coordinator());
        BulkStream {
            inner: Inner::Sequential { ctx, txn, batches },
            buffer: VecDeque::new(),
        }
    }

    /// Run the worker pool ahead of the consumer behind bounded channels
    pub(crate) fn concurrent(
        ctx: Arc<RunContext>,
        batches: Box<dyn Iterator<Item = Vec<BatchEntry>> + Send + 'static>,
    ) -> Self {
        let workers = ctx.options.max_concurrency;
        let (work_tx, work_rx) = mpsc::sync_channel::<Vec<BatchEntry>>(workers * 2);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (out_tx, out_rx) = mpsc::channel::<WorkerOutcome>();

        for _ in 0..workers {
            let ctx = Arc::clone(&ctx);
            let work_rx = Arc::clone(&work_rx);
            let out_tx = out_tx.clone();
            std::thread::spawn(move || worker_loop(&ctx, &work_rx, &out_tx));
        }
        drop(out_tx);

        {
            let ctx = Arc::clone(&ctx);
            let mut batches = batches;
            std::thread::spawn(move || {
                for batch in batches.by_ref() {
                    if ctx.aborted() || work_tx.send(batch).is_err() {
                        debug!(run = %ctx.token, "stream feeder stopping");
                        break;
                    }
                }
            });
        }

        BulkStream {
            inner: Inner::Concurrent { ctx, out_rx },
            buffer: VecDeque::new(),
        }
    }

    /// Wrap an already-aggregated result (the atomic path) as a stream
    pub(crate) fn from_result(result: BulkResult) -> Self {
        let mut buffer = VecDeque::new();
        for record in result.records.into_iter().flatten() {
            buffer.push_back(StreamItem::Record(record));
        }
        for error in result.errors.into_iter().flatten() {
            buffer.push_back(StreamItem::Error(error));
        }
        for notification in result.notifications.into_iter().flatten() {
            buffer.push_back(StreamItem::Notification(notification));
        }
        BulkStream {
            inner: Inner::Ready,
            buffer,
        }
    }

    fn refill(&mut self, outcome: WorkerOutcome, return_notifications: bool) {
        for sourced in outcome.records {
            self.buffer.push_back(StreamItem::Record(sourced.record));
        }
        for error in outcome.errors {
            self.buffer.push_back(StreamItem::Error(error));
        }
        if return_notifications {
            for notification in outcome.notifications {
                self.buffer.push_back(StreamItem::Notification(notification));
            }
        }
    }
}

impl Iterator for BulkStream {
    type Item = StreamItem;

    fn next(&mut self) -> Option<StreamItem> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            let (outcome, return_notifications) = match &mut self.inner {
                Inner::Ready => return None,
                Inner::Sequential { ctx, txn, batches } => {
                    let batch = batches.next()?;
                    let outcome = process_batch(ctx, txn, batch);
                    (outcome, ctx.options.return_notifications)
                }
                Inner::Concurrent { ctx, out_rx } => {
                    let outcome = out_rx.recv().ok()?;
                    (outcome, ctx.options.return_notifications)
                }
            };
            self.refill(outcome, return_notifications);
        }
    }
}

impl Drop for BulkStream {
    fn drop(&mut self) {
        if let Inner::Concurrent { ctx, .. } = &self.inner {
            // let in-flight workers wind down instead of racing a detached run
            ctx.signal_abort();
        }
    }
}
