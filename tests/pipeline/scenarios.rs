//! Accounting and classification scenarios

use std::sync::Arc;

use crate::common::*;
use scythe::{Bulk, Capability, RunOptions, RunStatus, Value};

#[test]
fn clean_run_is_success() {
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().batch_size(10).return_records())
        .run(tickets(25))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.records.unwrap().len(), 25);
    assert_eq!(layer.destroyed(), 25);
}

/// 100 records, batch size 10, concurrency 4, three failing validation.
#[test]
fn partial_failure_accounting() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .validation(Arc::new(RejectKeys(vec!["t-7", "t-42", "t-99"])))
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new().with_capability(Capability::AsyncExecution));
    let result = Bulk::destroy(layer.clone(), action)
        .options(
            RunOptions::new()
                .batch_size(10)
                .max_concurrency(4)
                .return_records(),
        )
        .run(tickets(100))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 3);
    assert_eq!(result.records.unwrap().len(), 97);
    assert_eq!(layer.destroyed(), 97);
}

#[test]
fn all_records_failing_is_error() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .validation(Arc::new(RejectKeys(vec!["t-0", "t-1", "t-2"])))
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), action)
        .run(tickets(3))
        .unwrap();

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error_count, 3);
    assert_eq!(layer.destroyed(), 0);
}

#[test]
fn empty_stream_is_success() {
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, plain_action()).run(Vec::new()).unwrap();
    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.error_count, 0);
}

#[test]
fn sorted_output_matches_source_positions_under_concurrency() {
    let layer = Arc::new(MemoryLayer::new().with_capability(Capability::AsyncExecution));
    let result = Bulk::destroy(layer, plain_action())
        .options(
            RunOptions::new()
                .batch_size(5)
                .max_concurrency(4)
                .sorted()
                .return_records(),
        )
        .run(tickets(60))
        .unwrap();

    let keys: Vec<String> = result
        .records
        .unwrap()
        .iter()
        .map(|record| record.key.to_string())
        .collect();
    let expected: Vec<String> = (0..60).map(|i| format!("t-{}", i)).collect();
    assert_eq!(keys, expected);
}

#[test]
fn error_count_survives_discarded_error_list() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .validation(Arc::new(RejectKeys(vec!["t-1"])))
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, action)
        .options(RunOptions::new().discard_errors())
        .run(tickets(3))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert!(result.errors.is_none());
}

#[test]
fn unrequested_lists_are_absent() {
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, plain_action())
        .run(tickets(3))
        .unwrap();

    assert!(result.records.is_none());
    assert!(result.notifications.is_none());
    // errors default to requested
    assert_eq!(result.errors.unwrap().len(), 0);
}

#[test]
fn changes_materialize_into_returned_records() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .change(Arc::new(StampChange))
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, action)
        .options(RunOptions::new().return_records())
        .run(tickets(2))
        .unwrap();

    for record in result.records.unwrap() {
        assert_eq!(record.field("archived"), Some(&Value::Bool(true)));
    }
}

#[test]
fn per_record_denials_fold_as_errors() {
    let mixed = vec![
        scythe::Record::new("ticket", "t-0").with_field("state", "open"),
        scythe::Record::new("ticket", "t-1").with_field("state", "closed"),
        scythe::Record::new("ticket", "t-2").with_field("state", "open"),
    ];
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), plain_action())
        .authorizer(Arc::new(DenyState("closed")))
        .options(RunOptions::new().return_records())
        .run(mixed)
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert!(matches!(
        result.errors.unwrap()[0],
        scythe::MutationError::Forbidden { .. }
    ));
    assert_eq!(layer.destroyed(), 2);
}

#[test]
fn skipping_authorization_bypasses_the_gate() {
    let record = scythe::Record::new("ticket", "t-0").with_field("state", "closed");
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), plain_action())
        .authorizer(Arc::new(DenyState("closed")))
        .options(RunOptions::new().skip_authorization())
        .run(vec![record])
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(layer.destroyed(), 1);
}

#[test]
fn notifications_carry_the_acting_principal() {
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, plain_action())
        .options(
            RunOptions::new()
                .return_notifications()
                .actor(scythe::Actor::new("u-1").with_role("admin")),
        )
        .run(tickets(1))
        .unwrap();

    let notifications = result.notifications.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].actor.as_ref().unwrap().id, "u-1");
    assert_eq!(notifications[0].action, "archive");
}

#[test]
fn data_layer_failures_fold_per_record() {
    let layer = Arc::new(MemoryLayer::new().fail_on("t-1"));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().batch_size(10).return_records())
        .run(tickets(4))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.records.unwrap().len(), 3);
    // siblings in the same batch still committed
    assert_eq!(layer.destroyed(), 3);
}
