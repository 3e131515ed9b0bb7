//! Manual executors: bulk and per-record

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::*;
use scythe::{
    Bulk, Changeset, ExecContext, ManualBatch, ManualOutcome, ManualRecord, MutationError,
    Notification, RunOptions, RunStatus,
};

/// Bulk manual executor: succeeds except for configured keys, and emits one
/// notification per invocation.
struct SoftDelete {
    fail: Vec<&'static str>,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl SoftDelete {
    fn new(fail: Vec<&'static str>) -> Self {
        SoftDelete {
            fail,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }
}

impl ManualBatch for SoftDelete {
    fn destroy_batch(&self, batch: &[Changeset], _: &ExecContext) -> Vec<ManualOutcome> {
        self.batch_sizes.lock().push(batch.len());
        let mut outcomes = Vec::new();
        for changeset in batch {
            let key = changeset.record().key.clone();
            if self.fail.contains(&key.as_str()) {
                outcomes.push(ManualOutcome::Failed(
                    key,
                    MutationError::validation("key", "manual failure"),
                ));
            } else {
                outcomes.push(ManualOutcome::Destroyed(changeset.materialize()));
            }
        }
        outcomes.push(ManualOutcome::Notify(Notification::now(
            "ticket".into(),
            "archive.manual",
            None,
            None,
        )));
        outcomes
    }
}

struct OneAtATime {
    pub calls: Mutex<usize>,
}

impl ManualRecord for OneAtATime {
    fn destroy(&self, changeset: &Changeset, _: &ExecContext) -> Vec<ManualOutcome> {
        *self.calls.lock() += 1;
        vec![ManualOutcome::Destroyed(changeset.materialize())]
    }
}

#[test]
fn manual_bulk_executor_is_invoked_once_per_batch() {
    let manual = Arc::new(SoftDelete::new(Vec::new()));
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .manual_batch(manual.clone())
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer.clone(), action)
        .options(RunOptions::new().batch_size(4).return_records())
        .run(tickets(10))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.records.unwrap().len(), 10);
    assert_eq!(manual.batch_sizes.lock().as_slice(), &[4, 4, 2]);
    // the data layer's native destroy was never touched
    assert_eq!(layer.destroyed(), 0);
}

#[test]
fn manual_outcomes_fold_into_the_accounting() {
    let manual = Arc::new(SoftDelete::new(vec!["t-1", "t-4"]));
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .manual_batch(manual)
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, action)
        .options(
            RunOptions::new()
                .batch_size(3)
                .return_records()
                .return_notifications(),
        )
        .run(tickets(6))
        .unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.error_count, 2);
    assert_eq!(result.records.unwrap().len(), 4);
    // one per destroyed record plus one per manual invocation (two batches)
    let notifications = result.notifications.unwrap();
    assert_eq!(notifications.len(), 6);
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n.action == "archive.manual")
            .count(),
        2
    );
}

#[test]
fn manual_record_executor_forces_batch_size_one() {
    let manual = Arc::new(OneAtATime {
        calls: Mutex::new(0),
    });
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .manual_record(manual.clone())
            .build(),
    );
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, action)
        // a large requested batch size must be ignored
        .options(RunOptions::new().batch_size(50).return_records())
        .run(tickets(7))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*manual.calls.lock(), 7);
    assert_eq!(result.records.unwrap().len(), 7);
}
