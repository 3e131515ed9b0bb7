//! The atomic path selector
//!
//! Decides whether a query-driven run collapses into one data-store-native
//! operation. The decision is conservative: anything the planner cannot
//! express atomically falls back to the streaming path, while a changeset
//! that is *provably* invalid up front errors immediately with no data-layer
//! call and therefore no side effects.

use tracing::debug;

use scythe_core::{
    BulkResult, Capability, MutationError, QueryExecuteOptions, QueryOutcome, RunStatus,
    TargetQuery,
};
use scythe_engine::{AtomicChange, AtomicSupport};

use crate::context::RunContext;

/// Why the atomic path was not taken
pub(crate) enum AtomicFallback {
    /// Not expressible atomically; stream instead
    Stream,
    /// Provably invalid before any data-layer call
    Invalid(MutationError),
}

/// The fully atomic changeset: the query narrowed by change restrictions
/// plus the attribute sets the native operation applies
pub(crate) struct AtomicPlan {
    pub query: TargetQuery,
}

/// Build the fully atomic changeset for this action against the query
pub(crate) fn plan(ctx: &RunContext, query: &TargetQuery) -> Result<AtomicPlan, AtomicFallback> {
    if !ctx.action.atomic_capable() || !ctx.data_layer.supports(Capability::DestroyQuery) {
        return Err(AtomicFallback::Stream);
    }

    let mut query = query.clone();
    for spec in ctx.action.changes() {
        // predicate-scoped changes cannot be expressed as one native call
        if !spec.unconditional() {
            return Err(AtomicFallback::Stream);
        }
        match spec.change.atomic() {
            Some(AtomicChange::Restrict(filter)) => query = query.filtered(filter),
            Some(AtomicChange::Set { .. }) => {}
            None => return Err(AtomicFallback::Stream),
        }
    }

    for spec in ctx.action.validations() {
        match spec.validation.atomic() {
            AtomicSupport::Supported => {}
            AtomicSupport::Unsupported => return Err(AtomicFallback::Stream),
            AtomicSupport::Invalid(error) => return Err(AtomicFallback::Invalid(error)),
        }
    }

    Ok(AtomicPlan { query })
}

/// Execute the planned atomic operation
pub(crate) fn execute(ctx: &RunContext, plan: AtomicPlan) -> BulkResult {
    let query = match ctx
        .gate
        .authorize_query(&plan.query, ctx.exec.actor.as_ref(), ctx.action.name())
    {
        Ok(query) => query,
        Err(error) => return error_result(ctx, error),
    };

    let native = match ctx.data_layer.compile_query(&query) {
        Ok(native) => native,
        Err(error) => return error_result(ctx, error.into()),
    };

    let opts = QueryExecuteOptions {
        return_records: ctx.options.return_records,
        tenant: ctx.options.tenant.clone(),
    };
    debug!(run = %ctx.token, resource = %query.resource, "executing atomic destroy");

    match ctx.data_layer.destroy_query(&native, &opts) {
        Ok(outcome) => {
            let records = match outcome {
                QueryOutcome::Done => ctx.options.return_records.then(Vec::new),
                QueryOutcome::Records(records) => Some(records),
            };
            let notifications = build_notifications(ctx, records.as_deref());
            BulkResult {
                status: RunStatus::Success,
                records: if ctx.options.return_records {
                    records
                } else {
                    None
                },
                errors: ctx.options.return_errors.then(Vec::new),
                error_count: 0,
                notifications,
            }
        }
        Err(error) => error_result(ctx, error.into()),
    }
}

/// An atomic-path failure: status `error` with a single wrapped error
pub(crate) fn error_result(ctx: &RunContext, error: MutationError) -> BulkResult {
    BulkResult {
        status: RunStatus::Error,
        records: ctx.options.return_records.then(Vec::new),
        errors: ctx.options.return_errors.then(|| vec![error]),
        error_count: 1,
        notifications: ctx.options.return_notifications.then(Vec::new),
    }
}

fn build_notifications(
    ctx: &RunContext,
    records: Option<&[scythe_core::Record]>,
) -> Option<Vec<scythe_core::Notification>> {
    if !ctx.wants_notifications() {
        return ctx.options.return_notifications.then(Vec::new);
    }
    let notifications = match records {
        Some(records) if !records.is_empty() => records
            .iter()
            .map(|record| {
                scythe_core::Notification::now(
                    ctx.action.resource().clone(),
                    ctx.action.name(),
                    Some(record.clone()),
                    ctx.exec.actor.clone(),
                )
            })
            .collect(),
        // one query-level notification when records were not materialized
        _ => vec![scythe_core::Notification::now(
            ctx.action.resource().clone(),
            ctx.action.name(),
            None,
            ctx.exec.actor.clone(),
        )],
    };
    if ctx.options.notify {
        if let Some(notifier) = &ctx.notifier {
            notifier.deliver(notifications.clone());
        }
    }
    ctx.options.return_notifications.then_some(notifications)
}
