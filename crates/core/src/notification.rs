//! Notifications emitted for committed mutations
//!
//! One notification describes one committed mutation (or one pushed-down
//! query). Delivery mechanics live behind [`crate::traits::Notifier`];
//! inside a transaction, delivery is deferred until the outcome is known so
//! rolled-back work never notifies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{Record, ResourceName};
use crate::types::Actor;

/// A committed-mutation notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Resource the mutation applied to
    pub resource: ResourceName,
    /// Name of the action that ran
    pub action: String,
    /// The committed record, when one was materialized
    pub record: Option<Record>,
    /// Actor the run executed on behalf of
    pub actor: Option<Actor>,
    /// When the mutation committed
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification stamped with the current time
    pub fn now(
        resource: ResourceName,
        action: impl Into<String>,
        record: Option<Record>,
        actor: Option<Actor>,
    ) -> Self {
        Notification {
            resource,
            action: action.into(),
            record,
            actor,
            occurred_at: Utc::now(),
        }
    }
}
