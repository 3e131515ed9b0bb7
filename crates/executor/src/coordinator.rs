//! The concurrency coordinator
//!
//! Batches fan out to a bounded pool of worker threads when the run allows
//! it; otherwise they run sequentially in submission order. Workers share a
//! single work queue (a bounded channel, so the feeder is back-pressured)
//! and return their outcomes over a result channel — the accumulator is
//! only ever touched on the coordinating thread, after a worker completes.
//!
//! Cancellation is a flag, not an escape: `stop_on_error` sets the run's
//! abort signal after the offending outcome is merged, the feeder stops
//! dispatching, and workers drain already-queued batches without processing
//! them.

use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use scythe_engine::TransactionCoordinator;

use crate::accumulator::{RunAccumulator, WorkerOutcome};
use crate::batch::process_batch;
use crate::context::RunContext;
use crate::partition::BatchEntry;

/// Process batches on the calling thread, in submission order
pub(crate) fn run_sequential(
    ctx: &RunContext,
    batches: impl Iterator<Item = Vec<BatchEntry>>,
    txn: &mut TransactionCoordinator,
    acc: &mut RunAccumulator,
) {
    for batch in batches {
        if ctx.aborted() {
            debug!(run = %ctx.token, "abort signalled; remaining batches not dispatched");
            break;
        }
        let outcome = process_batch(ctx, txn, batch);
        let had_errors = !outcome.errors.is_empty();
        acc.merge(outcome, &ctx.options);
        if ctx.options.stop_on_error && had_errors {
            ctx.signal_abort();
        }
    }
}

/// Fan batches out to a bounded worker pool and merge outcomes as they land
pub(crate) fn run_concurrent(
    ctx: &Arc<RunContext>,
    batches: impl Iterator<Item = Vec<BatchEntry>>,
    acc: &mut RunAccumulator,
) {
    let workers = ctx.options.max_concurrency;
    let (work_tx, work_rx) = mpsc::sync_channel::<Vec<BatchEntry>>(workers * 2);
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (out_tx, out_rx) = mpsc::channel::<WorkerOutcome>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let ctx = Arc::clone(ctx);
            let work_rx = Arc::clone(&work_rx);
            let out_tx = out_tx.clone();
            scope.spawn(move || worker_loop(&ctx, &work_rx, &out_tx));
        }
        drop(out_tx);

        for batch in batches {
            if ctx.aborted() {
                debug!(run = %ctx.token, "abort signalled; remaining batches not dispatched");
                break;
            }
            // merge whatever has already landed so the result channel
            // never buffers a whole unbounded stream
            while let Ok(outcome) = out_rx.try_recv() {
                merge(ctx, acc, outcome);
            }
            if work_tx.send(batch).is_err() {
                break;
            }
        }
        drop(work_tx);

        for outcome in out_rx.iter() {
            merge(ctx, acc, outcome);
        }
    });
}

/// Worker body: pull batches until the queue closes
///
/// Shared with the streaming path, which feeds the same channels from a
/// feeder thread instead of the coordinating thread.
pub(crate) fn worker_loop(
    ctx: &RunContext,
    work_rx: &Mutex<mpsc::Receiver<Vec<BatchEntry>>>,
    out_tx: &mpsc::Sender<WorkerOutcome>,
) {
    let mut txn = ctx.new_transaction_coordinator();
    loop {
        let batch = {
            let rx = work_rx.lock();
            rx.recv()
        };
        let Ok(batch) = batch else { break };
        if ctx.aborted() {
            debug!(run = %ctx.token, "dropping queued batch after abort");
            continue;
        }
        let outcome = process_batch(ctx, &mut txn, batch);
        if out_tx.send(outcome).is_err() {
            break;
        }
    }
}

fn merge(ctx: &RunContext, acc: &mut RunAccumulator, outcome: WorkerOutcome) {
    let had_errors = !outcome.errors.is_empty();
    acc.merge(outcome, &ctx.options);
    if ctx.options.stop_on_error && had_errors {
        ctx.signal_abort();
    }
}
