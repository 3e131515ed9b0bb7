//! Atomic path selection and fallback

use std::sync::Arc;

use crate::common::*;
use scythe::{
    AtomicChange, AtomicSupport, Bulk, Capability, Change, Changeset, ExecContext, Filter,
    MutationError, RunOptions, RunStatus, TargetQuery, Validation, Value,
};

/// A change the planner can push down: restrict to open tickets.
struct OnlyOpen;

impl Change for OnlyOpen {
    fn name(&self) -> &str {
        "only_open"
    }

    fn apply(&self, changeset: &mut Changeset, _: &ExecContext) -> Result<(), MutationError> {
        changeset.change_attribute("checked", Value::Bool(true));
        Ok(())
    }

    fn atomic(&self) -> Option<AtomicChange> {
        Some(AtomicChange::Restrict(Filter::Eq(
            "state".into(),
            Value::from("open"),
        )))
    }
}

struct AlwaysInvalid;

impl Validation for AlwaysInvalid {
    fn name(&self) -> &str {
        "always_invalid"
    }

    fn validate(&self, _: &Changeset, _: &ExecContext) -> Result<(), MutationError> {
        Err(MutationError::validation("state", "statically invalid"))
    }

    fn atomic(&self) -> AtomicSupport {
        AtomicSupport::Invalid(MutationError::validation("state", "statically invalid"))
    }
}

fn atomic_action() -> Arc<scythe::Action> {
    Arc::new(
        scythe::Action::builder("archive", "ticket")
            .atomic_capable()
            .build(),
    )
}

fn atomic_layer() -> MemoryLayer {
    MemoryLayer::new().with_capability(Capability::DestroyQuery)
}

#[test]
fn filtered_delete_collapses_to_one_native_call() {
    let layer = Arc::new(atomic_layer().seed(tickets(50)));
    let result = Bulk::destroy(layer.clone(), atomic_action())
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.error_count, 0);
    assert_eq!(*layer.destroy_query_calls.lock(), 1);
    // no per-record changesets were ever constructed
    assert_eq!(layer.destroyed(), 0);
    assert_eq!(layer.remaining("ticket"), 0);
}

#[test]
fn atomic_path_returns_records_when_requested() {
    let layer = Arc::new(atomic_layer().seed(tickets(5)));
    let result = Bulk::destroy(layer, atomic_action())
        .options(RunOptions::new().return_records())
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.records.unwrap().len(), 5);
}

#[test]
fn atomic_changes_narrow_the_pushed_down_query() {
    let mixed = tickets(4)
        .into_iter()
        .chain(std::iter::once(
            scythe::Record::new("ticket", "t-closed").with_field("state", "closed"),
        ))
        .collect::<Vec<_>>();
    let layer = Arc::new(atomic_layer().seed(mixed));
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .atomic_capable()
            .change(Arc::new(OnlyOpen))
            .build(),
    );
    let result = Bulk::destroy(layer.clone(), action)
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(layer.remaining("ticket"), 1);
    assert!(layer.contains("ticket", "t-closed"));
}

#[test]
fn missing_capability_falls_back_to_streaming() {
    let layer = Arc::new(MemoryLayer::new().seed(tickets(8)));
    let result = Bulk::destroy(layer.clone(), atomic_action())
        .options(RunOptions::new().batch_size(3))
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*layer.destroy_query_calls.lock(), 0);
    // the query was re-read and destroyed record by record
    assert_eq!(layer.destroyed(), 8);
}

#[test]
fn non_atomic_change_falls_back_to_streaming() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .atomic_capable()
            .change(Arc::new(StampChange))
            .build(),
    );
    let layer = Arc::new(atomic_layer().seed(tickets(4)));
    let result = Bulk::destroy(layer.clone(), action)
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(*layer.destroy_query_calls.lock(), 0);
    assert_eq!(layer.destroyed(), 4);
}

#[test]
fn statically_invalid_action_errors_with_no_side_effects() {
    let action = Arc::new(
        scythe::Action::builder("archive", "ticket")
            .atomic_capable()
            .validation(Arc::new(AlwaysInvalid))
            .build(),
    );
    let layer = Arc::new(atomic_layer().seed(tickets(4)));
    let result = Bulk::destroy(layer.clone(), action)
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error_count, 1);
    assert_eq!(*layer.destroy_query_calls.lock(), 0);
    assert_eq!(layer.destroyed(), 0);
    assert_eq!(layer.remaining("ticket"), 4);
}

#[test]
fn query_authorization_rewrites_narrow_the_selection() {
    let mixed = tickets(3)
        .into_iter()
        .chain(std::iter::once(
            scythe::Record::new("ticket", "t-closed").with_field("state", "closed"),
        ))
        .collect::<Vec<_>>();
    let layer = Arc::new(atomic_layer().seed(mixed));
    let result = Bulk::destroy(layer.clone(), atomic_action())
        .authorizer(Arc::new(DenyState("closed")))
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert!(layer.contains("ticket", "t-closed"));
    assert_eq!(layer.remaining("ticket"), 1);
}

#[test]
fn query_authorization_denial_aborts_the_atomic_attempt() {
    let layer = Arc::new(atomic_layer().seed(tickets(3)));
    let result = Bulk::destroy(layer.clone(), atomic_action())
        .authorizer(Arc::new(DenyAll))
        .run_query(&TargetQuery::all("ticket"))
        .unwrap();

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error_count, 1);
    assert!(matches!(
        result.errors.unwrap()[0],
        MutationError::Forbidden { .. }
    ));
    assert_eq!(*layer.destroy_query_calls.lock(), 0);
    assert_eq!(layer.remaining("ticket"), 3);
}

#[test]
fn query_filters_carry_into_the_fallback_stream() {
    let mixed = tickets(3)
        .into_iter()
        .chain(std::iter::once(
            scythe::Record::new("ticket", "t-closed").with_field("state", "closed"),
        ))
        .collect::<Vec<_>>();
    let layer = Arc::new(MemoryLayer::new().seed(mixed));
    let query = TargetQuery::all("ticket")
        .filtered(Filter::Eq("state".into(), Value::from("open")));
    let result = Bulk::destroy(layer.clone(), plain_action())
        .run_query(&query)
        .unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(layer.destroyed(), 3);
    assert!(layer.contains("ticket", "t-closed"));
}
