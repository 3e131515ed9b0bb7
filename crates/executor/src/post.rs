//! The post-execution pipeline
//!
//! Four stages, in order, after the executor returns materialized records:
//! 1. deferred after-action hooks
//! 2. relationship management
//! 3. deferred after-transaction hooks (run exactly once per record, on
//!    failure paths too)
//! 4. `after_batch` hooks of changes, scoped by the changeset tag sets to
//!    exactly the records each change touched
//!
//! Every stage may emit notifications (merged into the output) or errors
//! (merged, the affected record dropped from the success set).

use rustc_hash::FxHashMap;

use scythe_core::{HookStage, MutationError};
use scythe_engine::Changeset;

use crate::context::RunContext;
use crate::dispatch::ExecutionOutput;

fn by_index(changesets: &[Changeset]) -> FxHashMap<usize, &Changeset> {
    changesets
        .iter()
        .map(|cs| (cs.source_index(), cs))
        .collect()
}

/// Stage 1: after-action hooks against the committed records
pub(crate) fn run_after_action(changesets: &[Changeset], output: &mut ExecutionOutput) {
    let changesets = by_index(changesets);
    let mut kept = Vec::with_capacity(output.records.len());
    'records: for sourced in output.records.drain(..) {
        if let Some(changeset) = changesets.get(&sourced.source_index) {
            for hook in changeset.after_action_hooks() {
                match hook(&sourced.record) {
                    Ok(notifications) => output.notifications.extend(notifications),
                    Err(error) => {
                        output.errors.push(error);
                        output.destroyed -= 1;
                        continue 'records;
                    }
                }
            }
        }
        kept.push(sourced);
    }
    output.records = kept;
}

/// Stage 2: relationship management
pub(crate) fn run_relationships(changesets: &[Changeset], output: &mut ExecutionOutput) {
    let changesets = by_index(changesets);
    let mut kept = Vec::with_capacity(output.records.len());
    'records: for sourced in output.records.drain(..) {
        if let Some(changeset) = changesets.get(&sourced.source_index) {
            for pending in changeset.relationships() {
                match (pending.hook)(&sourced.record) {
                    Ok(notifications) => output.notifications.extend(notifications),
                    Err(error) => {
                        output.errors.push(MutationError::Relationship {
                            name: pending.name.clone(),
                            reason: error.to_string(),
                        });
                        output.destroyed -= 1;
                        continue 'records;
                    }
                }
            }
        }
        kept.push(sourced);
    }
    output.records = kept;
}

/// Stage 3: after-transaction hooks
///
/// Runs for every changeset in the batch, committed or not, exactly once.
/// A hook receives the materialized record when one survived execution and
/// the original snapshot otherwise.
pub(crate) fn run_after_transaction(changesets: &[Changeset], output: &mut ExecutionOutput) {
    let committed: FxHashMap<usize, usize> = output
        .records
        .iter()
        .enumerate()
        .map(|(position, sourced)| (sourced.source_index, position))
        .collect();

    let mut dropped: Vec<usize> = Vec::new();
    for changeset in changesets {
        if changeset.after_transaction_hooks().is_empty() {
            continue;
        }
        let position = committed.get(&changeset.source_index()).copied();
        let snapshot = match position {
            Some(position) => output.records[position].record.clone(),
            None => changeset.record().clone(),
        };
        for hook in changeset.after_transaction_hooks() {
            match hook(&snapshot) {
                Ok(notifications) => output.notifications.extend(notifications),
                Err(error) => {
                    output.errors.push(MutationError::Hook {
                        stage: HookStage::AfterTransaction,
                        reason: error.to_string(),
                    });
                    if let Some(position) = position {
                        if !dropped.contains(&position) {
                            dropped.push(position);
                            output.destroyed -= 1;
                        }
                    }
                }
            }
        }
    }

    if !dropped.is_empty() {
        dropped.sort_unstable();
        for position in dropped.into_iter().rev() {
            output.records.remove(position);
        }
    }
}

/// Stage 4: `after_batch` hooks, scoped to each change's tagged subset
pub(crate) fn run_after_batch(
    ctx: &RunContext,
    changesets: &[Changeset],
    output: &mut ExecutionOutput,
) {
    let changesets_by_index = by_index(changesets);
    for (index, spec) in ctx.action.changes().iter().enumerate() {
        if !spec.change.hooks().after_batch {
            continue;
        }
        let subset: Vec<usize> = output
            .records
            .iter()
            .enumerate()
            .filter(|(_, sourced)| {
                changesets_by_index
                    .get(&sourced.source_index)
                    .is_some_and(|cs| cs.applied(index))
            })
            .map(|(position, _)| position)
            .collect();
        if subset.is_empty() {
            continue;
        }
        let records: Vec<_> = subset
            .iter()
            .map(|&position| output.records[position].record.clone())
            .collect();
        match spec.change.after_batch(&records, &ctx.exec) {
            Ok(notifications) => output.notifications.extend(notifications),
            Err(error) => {
                output.errors.push(MutationError::Hook {
                    stage: HookStage::AfterBatch,
                    reason: error.to_string(),
                });
                output.destroyed -= subset.len();
                for position in subset.into_iter().rev() {
                    output.records.remove(position);
                }
            }
        }
    }
}
