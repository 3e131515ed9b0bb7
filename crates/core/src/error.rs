//! Error taxonomy for the pipeline
//!
//! Three tiers, kept deliberately distinct:
//! - [`ConfigError`]: invalid option combinations, rejected before any work
//!   starts — zero side effects
//! - [`CoreError`]: data-layer level failures (transactions, destroys,
//!   query compilation)
//! - [`MutationError`]: per-record failures accumulated during a run; one
//!   record's error never fails its siblings

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data-layer level errors
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CoreError {
    /// Target record or resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The data layer does not support the requested operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Transaction could not begin or commit
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// The enclosing transaction was rolled back
    #[error("rolled back: {0}")]
    RolledBack(String),

    /// Transaction exceeded its timeout
    #[error("transaction timeout: {0}")]
    Timeout(String),

    /// Bug or invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Pipeline stage a hook failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookStage {
    /// Batch callback before execution
    BeforeBatch,
    /// Deferred per-record hook after the action commits
    AfterAction,
    /// Deferred per-record hook after the transaction resolves
    AfterTransaction,
    /// Batch callback over a change's matched subset
    AfterBatch,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookStage::BeforeBatch => write!(f, "before_batch"),
            HookStage::AfterAction => write!(f, "after_action"),
            HookStage::AfterTransaction => write!(f, "after_transaction"),
            HookStage::AfterBatch => write!(f, "after_batch"),
        }
    }
}

/// Per-record (or per-query, on the atomic path) mutation failures
///
/// Accumulated into the run, never silently dropped. The materialized list
/// keeps merge order; only the record list is re-sorted under `sorted`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum MutationError {
    /// A declared validation rejected the record
    #[error("validation failed on {field}: {reason}")]
    Validation {
        /// Field the validation applies to
        field: String,
        /// Why the validation rejected it
        reason: String,
    },

    /// An input argument failed casting against its spec
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Argument name
        name: String,
        /// Why the cast failed
        reason: String,
    },

    /// The authorizer denied the mutation
    #[error("not authorized: {reason}")]
    Forbidden {
        /// Denial reason from the policy engine
        reason: String,
    },

    /// The data layer rejected the mutation
    #[error("data layer: {0}")]
    DataLayer(#[from] CoreError),

    /// A hook stage failed for this record
    #[error("{stage} hook failed: {reason}")]
    Hook {
        /// Stage the failure occurred in
        stage: HookStage,
        /// Failure description
        reason: String,
    },

    /// Relationship management failed for this record
    #[error("relationship {name}: {reason}")]
    Relationship {
        /// Relationship name
        name: String,
        /// Failure description
        reason: String,
    },

    /// The run was aborted before this work was dispatched
    #[error("aborted before dispatch")]
    Aborted,
}

impl MutationError {
    /// Shorthand for a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MutationError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an authorization denial
    pub fn forbidden(reason: impl Into<String>) -> Self {
        MutationError::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Invalid option combinations, rejected before any work starts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `transaction = all` cannot hold a transaction open across a
    /// caller-driven lazy stream
    #[error("transaction scope `all` is incompatible with streamed results")]
    StreamInsideTransaction,

    /// Sorting requires the full record list in memory
    #[error("sorted output is incompatible with streamed results")]
    SortedStream,

    /// Abort-on-error cannot short-circuit a caller-driven stream
    #[error("stop_on_error is incompatible with streamed results")]
    StopOnErrorStream,

    /// Batch size must be at least 1
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    /// Concurrency must be at least 1
    #[error("max_concurrency must be greater than zero")]
    ZeroConcurrency,
}
