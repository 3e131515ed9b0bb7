//! The execution dispatcher
//!
//! Drives the action's bound executor over one batch of valid changesets.
//! All three executors fold per-record failures into the output instead of
//! failing the batch: one record's error never prevents siblings from
//! committing. The only hard failures here are manual-executor contract
//! violations (a returned record that was never in the batch).

use rustc_hash::FxHashMap;
use tracing::debug;

use scythe_core::{CoreError, MutationError, Notification, Record, SourcedRecord};
use scythe_engine::{Changeset, ExecutorKind, ManualOutcome};

use crate::context::RunContext;

/// Working output of one batch's execution and hook stages
#[derive(Debug, Default)]
pub(crate) struct ExecutionOutput {
    /// Materialized records, kept only when the caller or a hook needs them
    pub records: Vec<SourcedRecord>,
    /// Count of destroyed records, tracked even when records are not kept
    pub destroyed: usize,
    /// Per-record errors
    pub errors: Vec<MutationError>,
    /// Collected notifications
    pub notifications: Vec<Notification>,
    /// Whether `records` is being materialized
    pub keep_records: bool,
}

impl ExecutionOutput {
    pub fn new(keep_records: bool) -> Self {
        ExecutionOutput {
            keep_records,
            ..Default::default()
        }
    }

    fn push_destroyed(&mut self, source_index: usize, record: Record) {
        self.destroyed += 1;
        if self.keep_records {
            self.records.push(SourcedRecord {
                source_index,
                record,
            });
        }
    }
}

/// Execute the batch through the action's bound executor
///
/// `changesets` must contain only valid changesets; invalid ones were
/// drained into the error accounting before dispatch.
pub(crate) fn execute(
    ctx: &RunContext,
    changesets: &[Changeset],
    output: &mut ExecutionOutput,
) -> Result<(), CoreError> {
    match ctx.action.executor() {
        ExecutorKind::Native => {
            for changeset in changesets {
                match ctx.data_layer.destroy(changeset.record()) {
                    Ok(()) => {
                        let record = changeset.materialize();
                        note_destroyed(ctx, &record, output);
                        output.push_destroyed(changeset.source_index(), record);
                    }
                    Err(error) => output.errors.push(error.into()),
                }
            }
            Ok(())
        }
        ExecutorKind::ManualBatch(manual) => {
            let outcomes = manual.destroy_batch(changesets, &ctx.exec);
            fold_manual(ctx, changesets, outcomes, output)
        }
        ExecutorKind::ManualRecord(manual) => {
            for changeset in changesets {
                let outcomes = manual.destroy(changeset, &ctx.exec);
                fold_manual(ctx, std::slice::from_ref(changeset), outcomes, output)?;
            }
            Ok(())
        }
    }
}

fn fold_manual(
    ctx: &RunContext,
    changesets: &[Changeset],
    outcomes: Vec<ManualOutcome>,
    output: &mut ExecutionOutput,
) -> Result<(), CoreError> {
    let index_by_key: FxHashMap<_, _> = changesets
        .iter()
        .map(|cs| (cs.record().key.clone(), cs.source_index()))
        .collect();

    for outcome in outcomes {
        match outcome {
            ManualOutcome::Destroyed(record) => match index_by_key.get(&record.key) {
                Some(&source_index) => {
                    note_destroyed(ctx, &record, output);
                    output.push_destroyed(source_index, record);
                }
                None => {
                    return Err(CoreError::Internal(format!(
                        "manual executor returned a record that was not in the batch: {}",
                        record.key
                    )))
                }
            },
            ManualOutcome::Failed(key, error) => {
                debug!(record = %key, %error, "manual executor reported failure");
                output.errors.push(error);
            }
            ManualOutcome::Notify(notification) => output.notifications.push(notification),
        }
    }
    Ok(())
}

fn note_destroyed(ctx: &RunContext, record: &Record, output: &mut ExecutionOutput) {
    if ctx.wants_notifications() {
        output.notifications.push(Notification::now(
            ctx.action.resource().clone(),
            ctx.action.name(),
            Some(record.clone()),
            ctx.exec.actor.clone(),
        ));
    }
}
