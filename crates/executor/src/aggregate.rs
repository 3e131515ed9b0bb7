//! The result aggregator
//!
//! Drains the run accumulator exactly once into the final [`BulkResult`]:
//! classifies the run, recovers source order when `sorted` was requested,
//! and applies the `return_*` gating. Only the record list is re-ordered;
//! errors and notifications keep merge order.

use tracing::debug;

use scythe_core::{BulkResult, RunOptions};

use crate::accumulator::RunAccumulator;

pub(crate) fn finalize(mut acc: RunAccumulator, options: &RunOptions) -> BulkResult {
    if options.sorted {
        acc.records.sort_by_key(|sourced| sourced.source_index);
    }
    let status = BulkResult::classify(acc.error_count, acc.success_count);
    debug!(
        run = %acc.token,
        ?status,
        errors = acc.error_count,
        destroyed = acc.success_count,
        completed_batches = acc.completed_batches,
        "run complete"
    );
    BulkResult {
        status,
        records: options
            .return_records
            .then(|| acc.records.into_iter().map(|s| s.record).collect()),
        errors: options.return_errors.then_some(acc.errors),
        error_count: acc.error_count,
        notifications: options.return_notifications.then_some(acc.notifications),
    }
}
