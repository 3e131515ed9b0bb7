//! Transactional scoping: per-batch rollback, whole-run rollback, and
//! deferred notification delivery

use std::sync::Arc;

use crate::common::*;
use scythe::{Bulk, Capability, RunOptions, RunStatus, TransactionScope};

fn transactional_layer() -> MemoryLayer {
    MemoryLayer::new().with_capability(Capability::Transactions)
}

#[test]
fn batch_scope_opens_one_transaction_per_batch() {
    let layer = Arc::new(transactional_layer());
    Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(10)
                .transaction(TransactionScope::Batch),
        )
        .run(tickets(35))
        .unwrap();

    assert_eq!(*layer.transactions_opened.lock(), 4);
}

#[test]
fn failed_batch_rolls_back_and_reports_the_error_alone() {
    // seed the store so rollback visibly restores destroyed rows
    let layer = Arc::new(
        transactional_layer()
            .fail_on("t-12")
            .seed(tickets(20)),
    );
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(10)
                .transaction(TransactionScope::Batch)
                .stop_on_error()
                .return_records(),
        )
        .run(tickets(20))
        .unwrap();

    // batch 1 (t-0..t-9) committed; batch 2 hit t-12 and rolled back
    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.records.unwrap().len(), 10);
    assert_eq!(layer.remaining("ticket"), 10);
    assert!(layer.contains("ticket", "t-12"));
    assert!(layer.contains("ticket", "t-10"));
    assert_eq!(layer.rollbacks.lock().as_slice(), &["ticket".to_string()]);
}

#[test]
fn without_stop_on_error_batch_scope_commits_partial_batches() {
    let layer = Arc::new(transactional_layer().fail_on("t-3").seed(tickets(5)));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .transaction(TransactionScope::Batch),
        )
        .run(tickets(5))
        .unwrap();

    // per-record failures fold without rolling back their siblings
    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert_eq!(layer.remaining("ticket"), 1);
    assert!(layer.contains("ticket", "t-3"));
    assert!(layer.rollbacks.lock().is_empty());
}

#[test]
fn whole_run_scope_rolls_everything_back_on_abort() {
    let layer = Arc::new(transactional_layer().fail_on("t-12").seed(tickets(20)));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(10)
                .transaction(TransactionScope::All)
                .stop_on_error()
                .return_records(),
        )
        .run(tickets(20))
        .unwrap();

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error_count, 1);
    assert!(result.records.unwrap().is_empty());
    // even the first batch's work was rolled back
    assert_eq!(layer.remaining("ticket"), 20);
}

#[test]
fn whole_run_scope_commits_once_when_clean() {
    let layer = Arc::new(transactional_layer().seed(tickets(15)));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .transaction(TransactionScope::All),
        )
        .run(tickets(15))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*layer.transactions_opened.lock(), 1);
    assert_eq!(layer.remaining("ticket"), 0);
}

#[test]
fn notifications_are_deferred_until_the_batch_commits() {
    let layer = Arc::new(transactional_layer());
    let notifier = Arc::new(RecordingNotifier::default());
    Bulk::destroy(layer, plain_action())
        .notifier(notifier.clone())
        .options(
            RunOptions::new()
                .batch_size(5)
                .transaction(TransactionScope::Batch)
                .notify(),
        )
        .run(tickets(10))
        .unwrap();

    // one deferred delivery per committed batch
    let deliveries = notifier.delivered.lock();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries.iter().map(Vec::len).sum::<usize>(), 10);
}

#[test]
fn rolled_back_batches_never_notify() {
    let layer = Arc::new(transactional_layer().fail_on("t-2").seed(tickets(5)));
    let notifier = Arc::new(RecordingNotifier::default());
    Bulk::destroy(layer, plain_action())
        .notifier(notifier.clone())
        .options(
            RunOptions::new()
                .batch_size(5)
                .transaction(TransactionScope::Batch)
                .stop_on_error()
                .notify(),
        )
        .run(tickets(5))
        .unwrap();

    assert_eq!(notifier.count(), 0);
}

#[test]
fn scope_none_commits_each_record_independently() {
    let layer = Arc::new(MemoryLayer::new().fail_on("t-1").seed(tickets(3)));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .run(tickets(3))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(layer.remaining("ticket"), 1);
    assert_eq!(*layer.transactions_opened.lock(), 0);
}
