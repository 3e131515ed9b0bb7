//! Run-scoped identity and execution-model types
//!
//! This module defines the small enums and tokens threaded through a run:
//! - [`RunToken`]: unique identifier scoping one execution's accumulator state
//! - [`Capability`]: what the data layer can do, queried before planning
//! - [`TransactionScope`]: the three transactional granularities
//! - [`Actor`] and [`TransactionMeta`]: context handed to collaborators

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::ResourceName;

/// Unique identifier for one pipeline run
///
/// Scopes the run accumulator and tags transaction metadata and log events so
/// concurrent runs against the same data layer stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunToken(Uuid);

impl RunToken {
    /// Create a new random run token
    pub fn new() -> Self {
        RunToken(Uuid::new_v4())
    }
}

impl Default for RunToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capabilities a data layer may declare
///
/// The planner queries these before committing to an execution shape; absent
/// capabilities degrade to the streaming, sequential, per-record paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// A filtered delete can be pushed down as one native operation
    DestroyQuery,
    /// Batches may be dispatched to concurrent workers
    AsyncExecution,
    /// `transaction` / `rollback` are honored rather than pass-through
    Transactions,
}

/// Transactional granularity of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionScope {
    /// Each record commits independently; no cross-record rollback
    #[default]
    None,
    /// One transaction per batch, covering the action resource plus any
    /// touched resources
    Batch,
    /// A single transaction around the entire run
    All,
}

impl std::fmt::Display for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionScope::None => write!(f, "none"),
            TransactionScope::Batch => write!(f, "batch"),
            TransactionScope::All => write!(f, "all"),
        }
    }
}

/// The principal a run executes on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier of the principal
    pub id: String,
    /// Roles granted to the principal, interpreted by the authorizer
    pub roles: Vec<String>,
}

impl Actor {
    /// Create an actor with no roles
    pub fn new(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    /// Add a role, returning self for chaining
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the actor holds the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Metadata handed to the data layer alongside a transaction body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    /// Run this transaction belongs to
    pub run: RunToken,
    /// Name of the action being executed
    pub action: String,
    /// Primary resource of the action
    pub resource: ResourceName,
    /// Tenant the run is scoped to, if any
    pub tenant: Option<String>,
}
