//! Collaborator traits
//!
//! The pipeline treats its surroundings as three opaque capabilities:
//! a [`DataLayer`] that can destroy records (and maybe push down whole
//! queries, run transactions, or tolerate concurrent workers), an
//! [`Authorizer`] wrapping the policy engine, and a [`Notifier`] wrapping
//! delivery. Adapters implement these; the pipeline never reaches around
//! them.

use std::time::Duration;

use crate::error::CoreError;
use crate::notification::Notification;
use crate::query::{NativeQuery, QueryExecuteOptions, QueryOutcome, TargetQuery};
use crate::record::{Record, ResourceName};
use crate::types::{Actor, Capability, TransactionMeta};

/// A stream of records produced by the data layer for a query re-read
pub type RecordStream = Box<dyn Iterator<Item = Result<Record, CoreError>> + Send>;

/// The opaque storage capability interface
///
/// All methods take `&self`; implementations are shared across workers
/// behind an `Arc` and must synchronize internally.
pub trait DataLayer: Send + Sync {
    /// Whether the data layer declares the given capability
    fn supports(&self, capability: Capability) -> bool;

    /// Destroy a single record
    fn destroy(&self, record: &Record) -> Result<(), CoreError>;

    /// Compile a declarative query into the adapter's native representation
    fn compile_query(&self, query: &TargetQuery) -> Result<NativeQuery, CoreError>;

    /// Execute a pushed-down destroy of everything the query selects
    ///
    /// Only called when [`Capability::DestroyQuery`] is declared.
    fn destroy_query(
        &self,
        query: &NativeQuery,
        opts: &QueryExecuteOptions,
    ) -> Result<QueryOutcome, CoreError>;

    /// Re-read a query into a record stream for the per-record path
    fn stream_query(&self, query: &TargetQuery) -> Result<RecordStream, CoreError>;

    /// Run `body` inside a transaction over the given resources
    ///
    /// The body is invoked exactly once. An `Err` from the body (or from
    /// commit) must leave none of the body's writes visible.
    fn transaction(
        &self,
        resources: &[ResourceName],
        timeout: Option<Duration>,
        meta: &TransactionMeta,
        body: &mut dyn FnMut() -> Result<(), CoreError>,
    ) -> Result<(), CoreError>;

    /// Explicitly roll back the transaction open on the given resource
    fn rollback(&self, resource: &ResourceName, error: &CoreError) -> Result<(), CoreError>;
}

/// Subject of an authorization check
#[derive(Debug, Clone, Copy)]
pub enum AuthSubject<'a> {
    /// One target record (per-record gate)
    Record(&'a Record),
    /// A whole declarative query (atomic-path gate)
    Query(&'a TargetQuery),
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    /// The mutation may proceed
    Allow,
    /// The mutation may proceed against a rewritten query
    ///
    /// Only meaningful for [`AuthSubject::Query`]; the policy engine may
    /// narrow the selection rather than deny it outright.
    AllowQuery(TargetQuery),
    /// The policy engine denied the mutation
    Deny {
        /// Denial reason
        reason: String,
    },
    /// The policy engine itself failed
    Failed {
        /// Failure description
        reason: String,
    },
}

/// The opaque policy-engine interface
pub trait Authorizer: Send + Sync {
    /// Whether `actor` may perform `action` on the subject
    fn can_perform(
        &self,
        subject: AuthSubject<'_>,
        actor: Option<&Actor>,
        action: &str,
    ) -> AuthDecision;
}

/// The opaque notification-delivery interface
///
/// Delivery failures are the adapter's concern; the pipeline treats
/// delivery as fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Deliver a batch of notifications
    fn deliver(&self, notifications: Vec<Notification>);
}
