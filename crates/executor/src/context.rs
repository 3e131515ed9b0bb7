//! Run-scoped shared context
//!
//! One [`RunContext`] is built per run and shared (behind an `Arc` under
//! concurrency) by the coordinator, the batch pipeline, and the dispatcher.
//! The abort flag is the only mutable cell: it is the cancellation signal
//! checked between batch dispatches, never a non-local escape.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scythe_core::{
    DataLayer, Notifier, RunOptions, RunToken, TransactionMeta, Value,
};
use scythe_engine::{Action, AuthorizationGate, ExecContext, TransactionCoordinator};

/// Everything a worker needs to process batches for one run
pub(crate) struct RunContext {
    pub action: Arc<Action>,
    pub data_layer: Arc<dyn DataLayer>,
    pub gate: AuthorizationGate,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub options: RunOptions,
    pub input: BTreeMap<String, Value>,
    pub token: RunToken,
    pub exec: ExecContext,
    abort: AtomicBool,
}

impl RunContext {
    pub fn new(
        action: Arc<Action>,
        data_layer: Arc<dyn DataLayer>,
        gate: AuthorizationGate,
        notifier: Option<Arc<dyn Notifier>>,
        options: RunOptions,
        input: BTreeMap<String, Value>,
    ) -> Self {
        let token = RunToken::new();
        let exec = ExecContext {
            run: token,
            actor: options.actor.clone(),
            tenant: options.tenant.clone(),
        };
        RunContext {
            action,
            data_layer,
            gate,
            notifier,
            options,
            input,
            token,
            exec,
            abort: AtomicBool::new(false),
        }
    }

    /// Whether materialized records leave the batch pipeline
    pub fn wants_records(&self) -> bool {
        self.options.return_records || self.options.return_stream
    }

    /// Whether per-record notifications are built at all
    pub fn wants_notifications(&self) -> bool {
        self.options.notify || self.options.return_notifications
    }

    /// Metadata handed to the data layer with every transaction
    pub fn transaction_meta(&self) -> TransactionMeta {
        TransactionMeta {
            run: self.token,
            action: self.action.name().to_string(),
            resource: self.action.resource().clone(),
            tenant: self.options.tenant.clone(),
        }
    }

    /// A fresh worker-local transaction coordinator
    pub fn new_transaction_coordinator(&self) -> TransactionCoordinator {
        TransactionCoordinator::new(
            Arc::clone(&self.data_layer),
            self.notifier.clone(),
            self.options.notify,
            self.options.timeout,
        )
    }

    /// Signal cancellation; checked between batch dispatches
    pub fn signal_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was signalled
    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}
