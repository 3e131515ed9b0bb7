//! # Scythe
//!
//! A bulk mutation execution pipeline for resource-backed data stores.
//!
//! Given a stream of target records or a declarative query, Scythe applies a
//! destructive (or update-like) action to each record — either as one atomic
//! operation pushed into the data store, or batch by batch with per-record
//! validation, authorization, hooks, and transactional scoping. Partial
//! failures are accounted, never silently dropped.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scythe::prelude::*;
//!
//! let action = Action::builder("archive", "ticket").build();
//! let result = Bulk::destroy(data_layer, Arc::new(action))
//!     .options(RunOptions::new().batch_size(50).return_records())
//!     .run(records)?;
//!
//! assert_eq!(result.status, RunStatus::Success);
//! ```
//!
//! ## Layers
//!
//! - [`scythe_core`]: values, records, queries, options, results, and the
//!   collaborator traits ([`DataLayer`], [`Authorizer`], [`Notifier`])
//! - [`scythe_engine`]: changesets, action descriptors, and batch machinery
//! - [`scythe_executor`]: scheduling, the atomic path, and aggregation
//!
//! This crate re-exports the pieces callers need and adds the [`Bulk`]
//! entry point.

#![warn(missing_docs)]

mod error;
mod pipeline;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use pipeline::Bulk;

// Re-export core types
pub use scythe_core::{
    Actor, AuthDecision, AuthSubject, Authorizer, BulkResult, Capability, ConfigError, CoreError,
    DataLayer, Filter, HookStage, MutationError, NativeQuery, Notification, Notifier,
    QueryExecuteOptions, QueryOutcome, Record, RecordKey, RecordStream, ResourceName, RunOptions,
    RunStatus, RunToken, SourcedRecord, StreamItem, TargetQuery, TransactionMeta,
    TransactionScope, Value, ValueKind,
};

// Re-export the action model
pub use scythe_engine::{
    Action, ActionBuilder, ArgumentSpec, AtomicChange, AtomicSupport, Change, ChangeHooks,
    ChangeSpec, Changeset, ExecContext, ExecutorKind, ManualBatch, ManualOutcome, ManualRecord,
    Predicate, Validation, ValidationSpec,
};

// Re-export the runner surface
pub use scythe_executor::{BulkRunner, BulkStream};
