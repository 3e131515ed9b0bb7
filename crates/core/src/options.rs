//! Caller-facing options surface
//!
//! [`RunOptions`] collects every knob a run accepts. Invalid combinations
//! are rejected by [`RunOptions::validate`] before any work starts — a
//! configuration error produces zero side effects.

use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{Actor, TransactionScope};

/// Options controlling one bulk run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Records per batch (ignored when the executor forces size 1)
    pub batch_size: usize,
    /// Upper bound on concurrent batch workers
    pub max_concurrency: usize,
    /// Transactional granularity
    pub transaction: TransactionScope,
    /// Materialize the destroyed records in the result
    pub return_records: bool,
    /// Materialize the error list in the result (the count is always kept)
    pub return_errors: bool,
    /// Materialize collected notifications in the result
    pub return_notifications: bool,
    /// Return a lazily-consumed stream instead of an aggregate result
    pub return_stream: bool,
    /// Reorder the final record list by original stream position
    pub sorted: bool,
    /// Abort remaining batches after the first error
    pub stop_on_error: bool,
    /// Deliver notifications through the notifier
    pub notify: bool,
    /// Run the authorization gate
    pub authorize: bool,
    /// Principal the run executes on behalf of
    pub actor: Option<Actor>,
    /// Tenant scope
    pub tenant: Option<String>,
    /// Timeout applied to data-layer transactions
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            batch_size: 100,
            max_concurrency: 1,
            transaction: TransactionScope::default(),
            return_records: false,
            return_errors: true,
            return_notifications: false,
            return_stream: false,
            sorted: false,
            stop_on_error: false,
            notify: false,
            authorize: true,
            actor: None,
            tenant: None,
            timeout: None,
        }
    }
}

impl RunOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the worker bound
    #[must_use]
    pub fn max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers;
        self
    }

    /// Set the transaction scope
    #[must_use]
    pub fn transaction(mut self, scope: TransactionScope) -> Self {
        self.transaction = scope;
        self
    }

    /// Request the destroyed records in the result
    #[must_use]
    pub fn return_records(mut self) -> Self {
        self.return_records = true;
        self
    }

    /// Omit the materialized error list (errors are still counted)
    #[must_use]
    pub fn discard_errors(mut self) -> Self {
        self.return_errors = false;
        self
    }

    /// Request collected notifications in the result
    #[must_use]
    pub fn return_notifications(mut self) -> Self {
        self.return_notifications = true;
        self
    }

    /// Request streamed output
    #[must_use]
    pub fn return_stream(mut self) -> Self {
        self.return_stream = true;
        self
    }

    /// Request source-order output
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    /// Abort remaining batches after the first error
    #[must_use]
    pub fn stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    /// Deliver notifications through the notifier
    #[must_use]
    pub fn notify(mut self) -> Self {
        self.notify = true;
        self
    }

    /// Skip the authorization gate
    #[must_use]
    pub fn skip_authorization(mut self) -> Self {
        self.authorize = false;
        self
    }

    /// Set the acting principal
    #[must_use]
    pub fn actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the tenant scope
    #[must_use]
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set the transaction timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject invalid option combinations
    ///
    /// Called once before planning; a failure here guarantees no data-layer
    /// call has been made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.return_stream {
            if self.transaction == TransactionScope::All {
                return Err(ConfigError::StreamInsideTransaction);
            }
            if self.sorted {
                return Err(ConfigError::SortedStream);
            }
            if self.stop_on_error {
                return Err(ConfigError::StopOnErrorStream);
            }
        }
        Ok(())
    }
}
