//! Core types for the Scythe bulk mutation pipeline
//!
//! This crate defines the fundamental vocabulary shared by every layer:
//! - [`Value`] and [`Record`]: the opaque data model the pipeline moves around
//! - [`TargetQuery`] and [`Filter`]: declarative target selection
//! - [`RunOptions`]: the caller-facing options surface, validated up front
//! - [`BulkResult`] and [`RunStatus`]: the aggregate outcome of a run
//! - collaborator traits ([`DataLayer`], [`Authorizer`], [`Notifier`]) that
//!   the surrounding system plugs concrete adapters into

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod notification;
pub mod options;
pub mod query;
pub mod record;
pub mod result;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{ConfigError, CoreError, HookStage, MutationError};
pub use notification::Notification;
pub use options::RunOptions;
pub use query::{Filter, NativeQuery, QueryExecuteOptions, QueryOutcome, TargetQuery};
pub use record::{Record, RecordKey, ResourceName};
pub use result::{BulkResult, RunStatus, SourcedRecord, StreamItem};
pub use traits::{
    AuthDecision, AuthSubject, Authorizer, DataLayer, Notifier, RecordStream,
};
pub use types::{Actor, Capability, RunToken, TransactionMeta, TransactionScope};
pub use value::{Value, ValueKind};
