//! The run entry point
//!
//! [`BulkRunner`] ties an action, a data layer, and the optional
//! collaborators together, validates the option surface up front (a
//! configuration error means zero side effects), then picks the execution
//! shape:
//! - query-driven runs try the atomic path first and fall back to re-reading
//!   the query as a record stream
//! - record-driven runs partition the stream and hand batches to the
//!   concurrency coordinator
//! - `transaction = all` wraps the whole run in one data-layer transaction
//!   and forces sequential processing (a single transaction cannot span
//!   workers)

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use scythe_core::{
    Authorizer, BulkResult, Capability, ConfigError, CoreError, DataLayer, Notifier, Record,
    RunOptions, TargetQuery, TransactionScope, Value,
};
use scythe_engine::{Action, AuthorizationGate};

use crate::accumulator::RunAccumulator;
use crate::aggregate;
use crate::atomic::{self, AtomicFallback};
use crate::context::RunContext;
use crate::coordinator;
use crate::partition::{BatchEntry, Partitioner};
use crate::stream::BulkStream;

/// Drives one bulk action over a record stream or a declarative query
pub struct BulkRunner {
    data_layer: Arc<dyn DataLayer>,
    action: Arc<Action>,
    authorizer: Option<Arc<dyn Authorizer>>,
    notifier: Option<Arc<dyn Notifier>>,
    options: RunOptions,
    input: BTreeMap<String, Value>,
}

impl BulkRunner {
    /// Bind an action to a data layer
    pub fn new(data_layer: Arc<dyn DataLayer>, action: Arc<Action>) -> Self {
        BulkRunner {
            data_layer,
            action,
            authorizer: None,
            notifier: None,
            options: RunOptions::default(),
            input: BTreeMap::new(),
        }
    }

    /// Attach the policy engine
    #[must_use]
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Attach the notification sink
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the run options
    #[must_use]
    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the action input, cast into every changeset during preparation
    #[must_use]
    pub fn input(mut self, input: BTreeMap<String, Value>) -> Self {
        self.input = input;
        self
    }

    /// Run over a record stream and aggregate the outcome
    ///
    /// `return_stream` is implied by which entry point is called; this one
    /// always aggregates.
    pub fn run<I>(mut self, records: I) -> Result<BulkResult, ConfigError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.options.return_stream = false;
        self.options.validate()?;
        let ctx = Arc::new(self.into_context());
        let batch_size = effective_batch_size(&ctx);
        let batches = Partitioner::new(records.into_iter().map(Ok), batch_size);
        Ok(drive(&ctx, batches))
    }

    /// Run a declarative query, preferring the atomic path
    pub fn run_query(mut self, query: &TargetQuery) -> Result<BulkResult, ConfigError> {
        self.options.return_stream = false;
        self.options.validate()?;
        let ctx = Arc::new(self.into_context());
        match atomic::plan(&ctx, query) {
            Ok(plan) => {
                debug!(run = %ctx.token, "atomic path selected");
                Ok(atomic::execute(&ctx, plan))
            }
            Err(AtomicFallback::Invalid(error)) => Ok(atomic::error_result(&ctx, error)),
            Err(AtomicFallback::Stream) => {
                debug!(run = %ctx.token, "atomic path unavailable; re-reading query");
                match ctx.data_layer.stream_query(query) {
                    Ok(records) => {
                        let batch_size = effective_batch_size(&ctx);
                        let batches = Partitioner::new(records, batch_size);
                        Ok(drive(&ctx, batches))
                    }
                    Err(error) => Ok(atomic::error_result(&ctx, error.into())),
                }
            }
        }
    }

    /// Run over a record stream, yielding results lazily
    pub fn stream<I>(mut self, records: I) -> Result<BulkStream, ConfigError>
    where
        I: Iterator<Item = Record> + Send + 'static,
    {
        self.options.return_stream = true;
        self.options.validate()?;
        // a stream's items are the records and errors; gating applies only
        // to aggregate results
        self.options.return_records = true;
        self.options.return_errors = true;
        let ctx = Arc::new(self.into_context());
        let batch_size = effective_batch_size(&ctx);
        let batches = Box::new(Partitioner::new(records.map(Ok), batch_size));
        Ok(make_stream(ctx, batches))
    }

    /// Run a declarative query, yielding results lazily
    pub fn stream_query(mut self, query: &TargetQuery) -> Result<BulkStream, ConfigError> {
        self.options.return_stream = true;
        self.options.validate()?;
        // a stream's items are the records and errors; gating applies only
        // to aggregate results
        self.options.return_records = true;
        self.options.return_errors = true;
        let ctx = Arc::new(self.into_context());
        match atomic::plan(&ctx, query) {
            Ok(plan) => {
                debug!(run = %ctx.token, "atomic path selected");
                Ok(BulkStream::from_result(atomic::execute(&ctx, plan)))
            }
            Err(AtomicFallback::Invalid(error)) => {
                Ok(BulkStream::from_result(atomic::error_result(&ctx, error)))
            }
            Err(AtomicFallback::Stream) => {
                debug!(run = %ctx.token, "atomic path unavailable; re-reading query");
                match ctx.data_layer.stream_query(query) {
                    Ok(records) => {
                        let batch_size = effective_batch_size(&ctx);
                        let batches = Box::new(Partitioner::new(records, batch_size));
                        Ok(make_stream(ctx, batches))
                    }
                    Err(error) => Ok(BulkStream::from_result(atomic::error_result(
                        &ctx,
                        error.into(),
                    ))),
                }
            }
        }
    }

    fn into_context(self) -> RunContext {
        let gate = AuthorizationGate::new(self.authorizer, self.options.authorize);
        RunContext::new(
            self.action,
            self.data_layer,
            gate,
            self.notifier,
            self.options,
            self.input,
        )
    }
}

fn effective_batch_size(ctx: &RunContext) -> usize {
    ctx.action
        .forced_batch_size()
        .unwrap_or(ctx.options.batch_size)
}

fn concurrency_enabled(ctx: &RunContext) -> bool {
    ctx.options.max_concurrency > 1 && ctx.data_layer.supports(Capability::AsyncExecution)
}

fn make_stream(
    ctx: Arc<RunContext>,
    batches: Box<dyn Iterator<Item = Vec<BatchEntry>> + Send + 'static>,
) -> BulkStream {
    if concurrency_enabled(&ctx) {
        BulkStream::concurrent(ctx, batches)
    } else {
        BulkStream::sequential(ctx, batches)
    }
}

fn drive(ctx: &Arc<RunContext>, batches: impl Iterator<Item = Vec<BatchEntry>>) -> BulkResult {
    let mut acc = RunAccumulator::new(ctx.token);

    match ctx.options.transaction {
        TransactionScope::All => {
            let mut txn = ctx.new_transaction_coordinator();
            let resources = ctx.action.transaction_resources();
            let meta = ctx.transaction_meta();
            let result = txn.in_transaction(&resources, &meta, |txn| {
                coordinator::run_sequential(ctx, batches, txn, &mut acc);
                if ctx.options.stop_on_error && acc.error_count > 0 {
                    return Err(CoreError::RolledBack("run aborted after first error".into()));
                }
                Ok(())
            });
            if let Err(error) = result {
                warn!(run = %ctx.token, %error, "whole-run transaction rolled back");
                acc.discard_successes();
                if acc.error_count == 0 {
                    acc.error_count = 1;
                    if ctx.options.return_errors {
                        acc.errors.push(error.into());
                    }
                }
            }
        }
        TransactionScope::None | TransactionScope::Batch => {
            if concurrency_enabled(ctx) {
                coordinator::run_concurrent(ctx, batches, &mut acc);
            } else {
                let mut txn = ctx.new_transaction_coordinator();
                coordinator::run_sequential(ctx, batches, &mut txn, &mut acc);
            }
        }
    }

    aggregate::finalize(acc, &ctx.options)
}
