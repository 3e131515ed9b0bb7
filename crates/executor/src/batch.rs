//! The per-batch pipeline
//!
//! One batch flows through: preparation → validations → changes →
//! authorization → before-batch hooks → (transaction) execution →
//! post-execution stages. The stage order is fixed; the transaction scope
//! only decides where the commit boundary falls:
//! - `None`/`All`: no batch-level transaction here (for `All` the caller
//!   already wrapped the whole run)
//! - `Batch`: dispatch plus the transactional hook stages (after-action,
//!   relationships) run inside one data-layer transaction; after-transaction
//!   and after-batch hooks run once the transaction has resolved

use tracing::debug;

use scythe_core::{CoreError, MutationError, TransactionScope};
use scythe_engine::{
    prepare, run_before_batch, run_changes, run_validations, Changeset, TransactionCoordinator,
};

use crate::accumulator::WorkerOutcome;
use crate::context::RunContext;
use crate::dispatch::{execute, ExecutionOutput};
use crate::partition::BatchEntry;
use crate::post;

/// Process one batch to a worker outcome
///
/// Never panics across batches: every failure lands in the outcome's error
/// list, so one batch cannot corrupt accumulator state for its siblings.
pub(crate) fn process_batch(
    ctx: &RunContext,
    txn: &mut TransactionCoordinator,
    entries: Vec<BatchEntry>,
) -> WorkerOutcome {
    let mut pre_errors: Vec<MutationError> = Vec::new();
    let mut changesets: Vec<Changeset> = Vec::with_capacity(entries.len());
    for (source_index, entry) in entries {
        match entry {
            Ok(record) => changesets.push(prepare(record, &ctx.input, &ctx.action, source_index)),
            Err(read_error) => pre_errors.push(read_error.into()),
        }
    }

    run_validations(&mut changesets, &ctx.action, &ctx.exec);
    let applied = run_changes(&mut changesets, &ctx.action, &ctx.exec);
    ctx.gate
        .authorize_batch(&mut changesets, ctx.exec.actor.as_ref(), ctx.action.name());

    let mut output = ExecutionOutput::new(ctx.wants_records() || applied.must_return_records);
    output
        .notifications
        .extend(run_before_batch(&mut changesets, &ctx.action, &ctx.exec));

    // invalid changesets stay out of dispatch; their errors still count
    for changeset in changesets.iter_mut().filter(|cs| !cs.is_valid()) {
        pre_errors.extend(changeset.take_errors());
    }

    if ctx.options.stop_on_error && !pre_errors.is_empty() {
        // nothing dispatched: the first error aborts before any commit
        output.errors.extend(pre_errors);
        return finish(ctx, txn, &changesets, output, false);
    }

    let valid: Vec<Changeset> = {
        let mut valid = Vec::with_capacity(changesets.len());
        let mut rest = Vec::new();
        for changeset in changesets.drain(..) {
            if changeset.is_valid() {
                valid.push(changeset);
            } else {
                rest.push(changeset);
            }
        }
        changesets = rest;
        valid
    };

    let completed = match ctx.options.transaction {
        TransactionScope::Batch => {
            let resources = ctx.action.transaction_resources();
            let meta = ctx.transaction_meta();
            let stop_on_error = ctx.options.stop_on_error;
            let result = txn.in_transaction(&resources, &meta, |txn| {
                execute_transactional(ctx, txn, &valid, &mut output)?;
                if stop_on_error && !output.errors.is_empty() {
                    return Err(CoreError::RolledBack(
                        "batch aborted after first error".into(),
                    ));
                }
                Ok(())
            });
            match result {
                Ok(()) => true,
                Err(error) => {
                    debug!(run = %ctx.token, %error, "batch rolled back");
                    // rolled-back work contributes its errors and nothing else
                    let errors = std::mem::take(&mut output.errors);
                    output = ExecutionOutput::new(false);
                    output.errors = errors;
                    if output.errors.is_empty() {
                        output.errors.push(MutationError::DataLayer(error));
                    }
                    false
                }
            }
        }
        TransactionScope::None | TransactionScope::All => {
            match execute_transactional(ctx, txn, &valid, &mut output) {
                Ok(()) => true,
                Err(error) => {
                    output.errors.push(MutationError::DataLayer(error));
                    false
                }
            }
        }
    };

    // recombine so the remaining stages see every changeset once
    changesets.extend(valid);
    output.errors.splice(0..0, pre_errors);
    finish(ctx, txn, &changesets, output, completed)
}

/// Dispatch plus the transactional hook stages
fn execute_transactional(
    ctx: &RunContext,
    txn: &mut TransactionCoordinator,
    valid: &[Changeset],
    output: &mut ExecutionOutput,
) -> Result<(), CoreError> {
    execute(ctx, valid, output)?;
    post::run_after_action(valid, output);
    post::run_relationships(valid, output);
    // work committed in this transaction notifies only after it resolves
    txn.queue(output.notifications.clone());
    Ok(())
}

/// The stages that run after the commit boundary, then outcome shaping
fn finish(
    ctx: &RunContext,
    txn: &mut TransactionCoordinator,
    changesets: &[Changeset],
    mut output: ExecutionOutput,
    completed: bool,
) -> WorkerOutcome {
    let before = output.notifications.len();
    post::run_after_transaction(changesets, &mut output);
    post::run_after_batch(ctx, changesets, &mut output);
    // notifications from post-transaction stages deliver immediately
    txn.queue(output.notifications[before..].to_vec());

    WorkerOutcome {
        records: output.records,
        destroyed: output.destroyed,
        errors: output.errors,
        notifications: output.notifications,
        completed,
    }
}
