//! The change/validation executor
//!
//! Drives the declared validations and changes over one batch, honoring the
//! predicate scoping rules:
//! - an unconditional change applies to the entire batch in one call (the
//!   whole-batch fast path) and tags every changeset
//! - a scoped change splits the batch into matches and non-matches, applies
//!   only to matches, recombines matches ahead of non-matches, and tags the
//!   matched changesets
//!
//! Tags are what later scope `before_batch`/`after_batch` to exactly the
//! population a change touched.

use tracing::trace;

use crate::action::{Action, ExecContext};
use crate::changeset::Changeset;
use scythe_core::Notification;

/// What the change step learned about the batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchApplied {
    /// Execution must keep materialized records even if the caller did not
    /// request them: a changeset gained a relationship op or an
    /// after-action hook, or an applied change declares `after_batch`
    pub must_return_records: bool,
}

/// Run every declared validation over the batch
///
/// Predicates are AND-combined; changesets whose predicate fails are left
/// untouched. A validation failure appends an error without discarding the
/// changeset from the batch.
pub fn run_validations(batch: &mut [Changeset], action: &Action, ctx: &ExecContext) {
    for spec in action.validations() {
        for changeset in batch.iter_mut() {
            if !spec.applies_to(changeset) {
                continue;
            }
            if let Err(error) = spec.validation.validate(changeset, ctx) {
                trace!(
                    validation = spec.validation.name(),
                    record = %changeset.record().key,
                    "validation rejected record"
                );
                changeset.add_error(error);
            }
        }
    }
}

/// Run every declared change over the batch, in declaration order
pub fn run_changes(batch: &mut Vec<Changeset>, action: &Action, ctx: &ExecContext) -> BatchApplied {
    for (index, spec) in action.changes().iter().enumerate() {
        if spec.unconditional() {
            for changeset in batch.iter_mut() {
                changeset.tag_change(index);
            }
            spec.change.apply_batch(batch, ctx);
        } else {
            let mut matches = Vec::with_capacity(batch.len());
            let mut rest = Vec::new();
            for changeset in batch.drain(..) {
                if spec.applies_to(&changeset) {
                    matches.push(changeset);
                } else {
                    rest.push(changeset);
                }
            }
            for changeset in matches.iter_mut() {
                changeset.tag_change(index);
            }
            spec.change.apply_batch(&mut matches, ctx);
            // matches come back ahead of non-matches
            matches.extend(rest);
            *batch = matches;
        }
    }

    let mut must_return_records = batch.iter().any(Changeset::needs_materialized_result);
    if !must_return_records {
        must_return_records = action.changes().iter().enumerate().any(|(index, spec)| {
            spec.change.hooks().after_batch && batch.iter().any(|cs| cs.applied(index))
        });
    }

    BatchApplied { must_return_records }
}

/// Run `before_batch` callbacks over each change's matched subset
///
/// Uses the tag sets recorded by [`run_changes`], so a change's callback
/// sees exactly the changesets its apply step touched.
pub fn run_before_batch(
    batch: &mut Vec<Changeset>,
    action: &Action,
    ctx: &ExecContext,
) -> Vec<Notification> {
    let mut notifications = Vec::new();
    for (index, spec) in action.changes().iter().enumerate() {
        if !spec.change.hooks().before_batch {
            continue;
        }
        let mut matched = Vec::with_capacity(batch.len());
        let mut rest = Vec::new();
        for changeset in batch.drain(..) {
            if changeset.applied(index) {
                matched.push(changeset);
            } else {
                rest.push(changeset);
            }
        }
        if !matched.is_empty() {
            notifications.extend(spec.change.before_batch(&mut matched, ctx));
        }
        matched.extend(rest);
        *batch = matched;
    }
    notifications
}
