//! Transaction coordination
//!
//! One [`TransactionCoordinator`] lives inside each worker (and one at run
//! scope for whole-run transactions). It owns two responsibilities:
//!
//! 1. Running a body inside a data-layer transaction over the action's full
//!    lock set, issuing an explicit rollback instruction when the body
//!    fails.
//! 2. Deferring notification delivery while any transaction is open. The
//!    first entrant into a nesting level delivers the deferred batch when it
//!    exits successfully; a rolled-back transaction delivers nothing.
//!
//! A data layer that does not declare [`Capability::Transactions`] degrades
//! to per-record commit: the body runs directly and a warning is logged
//! once per coordinator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use scythe_core::{
    Capability, CoreError, DataLayer, Notification, Notifier, ResourceName, TransactionMeta,
};

/// Worker-local transaction and notification coordinator
pub struct TransactionCoordinator {
    data_layer: Arc<dyn DataLayer>,
    notifier: Option<Arc<dyn Notifier>>,
    notify: bool,
    timeout: Option<Duration>,
    depth: usize,
    deferred: Vec<Notification>,
    warned_unsupported: bool,
}

impl TransactionCoordinator {
    /// Build a coordinator
    ///
    /// `notify` mirrors the run option: when false, queued notifications are
    /// dropped instead of delivered (collection for the result happens
    /// elsewhere).
    pub fn new(
        data_layer: Arc<dyn DataLayer>,
        notifier: Option<Arc<dyn Notifier>>,
        notify: bool,
        timeout: Option<Duration>,
    ) -> Self {
        TransactionCoordinator {
            data_layer,
            notifier,
            notify,
            timeout,
            depth: 0,
            deferred: Vec::new(),
            warned_unsupported: false,
        }
    }

    /// Whether the data layer honors transactions
    pub fn supported(&self) -> bool {
        self.data_layer.supports(Capability::Transactions)
    }

    /// Queue notifications for delivery
    ///
    /// Outside a transaction they are delivered immediately; inside one they
    /// are deferred until the outermost level commits.
    pub fn queue(&mut self, notifications: Vec<Notification>) {
        if !self.notify || self.notifier.is_none() || notifications.is_empty() {
            return;
        }
        if self.depth > 0 {
            self.deferred.extend(notifications);
        } else if let Some(notifier) = &self.notifier {
            notifier.deliver(notifications);
        }
    }

    /// Run `body` inside a data-layer transaction over `resources`
    ///
    /// The body's error rolls the transaction back (with an explicit
    /// rollback instruction to the data layer) and discards any
    /// notifications deferred at this nesting level.
    pub fn in_transaction<T>(
        &mut self,
        resources: &[ResourceName],
        meta: &TransactionMeta,
        body: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        if !self.supported() {
            if !self.warned_unsupported {
                warn!(
                    action = %meta.action,
                    "data layer does not support transactions; committing per record"
                );
                self.warned_unsupported = true;
            }
            return body(self);
        }

        let data_layer = Arc::clone(&self.data_layer);
        let timeout = self.timeout;
        let deferred_mark = self.deferred.len();
        self.depth += 1;

        let mut output = None;
        let mut body = Some(body);
        let mut body_error: Option<CoreError> = None;
        let result = data_layer.transaction(resources, timeout, meta, &mut || {
            let body = body.take().ok_or_else(|| {
                CoreError::Internal("transaction body invoked more than once".into())
            })?;
            match body(self) {
                Ok(value) => {
                    output = Some(value);
                    Ok(())
                }
                Err(error) => {
                    body_error = Some(error.clone());
                    Err(error)
                }
            }
        });
        self.depth -= 1;

        match result {
            Ok(()) => {
                let output = output.ok_or_else(|| {
                    CoreError::Internal("transaction committed without invoking its body".into())
                })?;
                if self.depth == 0 {
                    self.flush();
                }
                Ok(output)
            }
            Err(error) => {
                // work deferred inside the rolled-back level never notifies
                self.deferred.truncate(deferred_mark);
                if body_error.is_some() {
                    if let Some(primary) = resources.first() {
                        debug!(resource = %primary, %error, "rolling back transaction");
                        if let Err(rollback_error) = self.data_layer.rollback(primary, &error) {
                            warn!(%rollback_error, "rollback instruction failed");
                        }
                    }
                }
                Err(error)
            }
        }
    }

    fn flush(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        if let Some(notifier) = &self.notifier {
            let batch = std::mem::take(&mut self.deferred);
            debug!(count = batch.len(), "delivering deferred notifications");
            notifier.deliver(batch);
        }
    }
}
