//! Mutation model and batch machinery for the Scythe pipeline
//!
//! This crate owns everything that happens *inside* one batch, independent of
//! how batches are scheduled:
//! - [`Changeset`]: the mutable unit of work for one target record
//! - [`Action`] and its [`Change`]/[`Validation`] descriptors
//! - changeset preparation (input casting)
//! - the change/validation executor with predicate-scoped subsets
//! - the authorization gate
//! - the transaction coordinator with deferred notification delivery
//!
//! Scheduling, dispatch, and aggregation live in `scythe-executor`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod apply;
pub mod authorize;
pub mod changeset;
pub mod prepare;
pub mod transaction;

pub use action::{
    Action, ActionBuilder, ArgumentSpec, AtomicChange, AtomicSupport, Change, ChangeHooks,
    ChangeSpec, ExecContext, ExecutorKind, ManualBatch, ManualOutcome, ManualRecord, Predicate,
    Validation, ValidationSpec,
};
pub use apply::{run_before_batch, run_changes, run_validations, BatchApplied};
pub use authorize::AuthorizationGate;
pub use changeset::{
    AfterActionHook, AfterTransactionHook, Changeset, PendingRelationship, RelationshipHook,
};
pub use prepare::prepare;
pub use transaction::TransactionCoordinator;
