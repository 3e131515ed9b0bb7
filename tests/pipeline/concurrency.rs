//! Worker-pool behavior: capability gating, abort, and merge isolation

use std::sync::Arc;

use crate::common::*;
use scythe::{Bulk, Capability, RunOptions, RunStatus, TransactionScope};

#[test]
fn concurrency_requires_the_capability() {
    // without AsyncExecution the pool is never spun up; the run still
    // completes sequentially with identical accounting
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .max_concurrency(8)
                .return_records(),
        )
        .run(tickets(20))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.records.unwrap().len(), 20);
}

#[test]
fn worker_errors_merge_without_corrupting_siblings() {
    let layer = Arc::new(
        MemoryLayer::new()
            .with_capability(Capability::AsyncExecution)
            .fail_on("t-13")
            .fail_on("t-27"),
    );
    let result = Bulk::destroy(layer, plain_action())
        .options(
            RunOptions::new()
                .batch_size(4)
                .max_concurrency(4)
                .return_records(),
        )
        .run(tickets(40))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 2);
    assert_eq!(result.records.unwrap().len(), 38);
}

#[test]
fn stop_on_error_cancels_remaining_batches() {
    let layer = Arc::new(
        MemoryLayer::new()
            .with_capability(Capability::AsyncExecution)
            .fail_on("t-0"),
    );
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(1)
                .max_concurrency(2)
                .stop_on_error(),
        )
        .run(tickets(500))
        .unwrap();

    // the first batch fails; far from all of the remaining 499 run
    assert!(result.error_count >= 1);
    assert!(
        layer.destroyed() < 500,
        "abort should keep queued batches from dispatching"
    );
    assert!(matches!(
        result.status,
        RunStatus::PartialSuccess | RunStatus::Error
    ));
}

#[test]
fn sequential_stop_on_error_is_deterministic() {
    let layer = Arc::new(MemoryLayer::new().fail_on("t-10"));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .stop_on_error()
                .return_records(),
        )
        .run(tickets(30))
        .unwrap();

    // the failing batch still commits its siblings (t-11..t-14); nothing
    // after it is dispatched
    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert_eq!(layer.destroyed(), 14);
    assert_eq!(result.records.unwrap().len(), 14);
}

#[test]
fn per_batch_transactions_compose_with_concurrency() {
    let layer = Arc::new(
        MemoryLayer::new()
            .with_capability(Capability::AsyncExecution)
            .with_capability(Capability::Transactions),
    );
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .max_concurrency(4)
                .transaction(TransactionScope::Batch),
        )
        .run(tickets(40))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*layer.transactions_opened.lock(), 8);
    assert_eq!(layer.destroyed(), 40);
}
