//! The authorization gate
//!
//! Wraps the policy engine for both granularities: per-record checks fold
//! denials into changeset errors (the record stays in its batch), while the
//! atomic path's per-query check either passes — possibly with a rewritten,
//! narrowed query — or aborts the whole atomic attempt.

use std::sync::Arc;

use tracing::warn;

use scythe_core::{
    Actor, AuthDecision, AuthSubject, Authorizer, MutationError, TargetQuery,
};

use crate::changeset::Changeset;

/// Per-run authorization gate
pub struct AuthorizationGate {
    authorizer: Option<Arc<dyn Authorizer>>,
    enabled: bool,
}

impl AuthorizationGate {
    /// Build a gate; a disabled gate (or one with no authorizer bound)
    /// allows everything
    pub fn new(authorizer: Option<Arc<dyn Authorizer>>, enabled: bool) -> Self {
        AuthorizationGate {
            authorizer,
            enabled,
        }
    }

    fn active(&self) -> Option<&Arc<dyn Authorizer>> {
        if self.enabled {
            self.authorizer.as_ref()
        } else {
            None
        }
    }

    /// Check every valid changeset in the batch
    ///
    /// Denials and policy-engine failures become changeset errors; they
    /// never abort the run.
    pub fn authorize_batch(&self, batch: &mut [Changeset], actor: Option<&Actor>, action: &str) {
        let Some(authorizer) = self.active() else {
            return;
        };
        for changeset in batch.iter_mut() {
            if !changeset.is_valid() {
                continue;
            }
            match authorizer.can_perform(AuthSubject::Record(changeset.record()), actor, action) {
                AuthDecision::Allow => {}
                AuthDecision::AllowQuery(_) => {
                    // a query rewrite has no meaning for a record subject
                    changeset.add_error(MutationError::forbidden(
                        "authorizer returned a query rewrite for a record subject",
                    ));
                }
                AuthDecision::Deny { reason } => {
                    changeset.add_error(MutationError::forbidden(reason));
                }
                AuthDecision::Failed { reason } => {
                    changeset.add_error(MutationError::forbidden(format!(
                        "authorization check failed: {}",
                        reason
                    )));
                }
            }
        }
    }

    /// Check a whole query (atomic path)
    ///
    /// Returns the query to execute — the authorizer may narrow it — or the
    /// error that aborts the atomic attempt.
    pub fn authorize_query(
        &self,
        query: &TargetQuery,
        actor: Option<&Actor>,
        action: &str,
    ) -> Result<TargetQuery, MutationError> {
        let Some(authorizer) = self.active() else {
            return Ok(query.clone());
        };
        match authorizer.can_perform(AuthSubject::Query(query), actor, action) {
            AuthDecision::Allow => Ok(query.clone()),
            AuthDecision::AllowQuery(rewritten) => Ok(rewritten),
            AuthDecision::Deny { reason } => {
                warn!(%query.resource, action, "query authorization denied");
                Err(MutationError::forbidden(reason))
            }
            AuthDecision::Failed { reason } => Err(MutationError::forbidden(format!(
                "authorization check failed: {}",
                reason
            ))),
        }
    }
}
