//! High-level typed entry point
//!
//! [`Bulk`] wraps [`BulkRunner`] with the common construction flow: bind an
//! action to a data layer, attach collaborators, set options, run. Each
//! method hands back the runner so the full builder surface stays available.

use std::collections::BTreeMap;
use std::sync::Arc;

use scythe_core::{
    Authorizer, BulkResult, DataLayer, Notifier, Record, RunOptions, TargetQuery, Value,
};
use scythe_engine::Action;
use scythe_executor::{BulkRunner, BulkStream};

use crate::error::Result;

/// Entry point for bulk mutation runs
///
/// ```ignore
/// let result = Bulk::destroy(data_layer, action)
///     .authorizer(policy)
///     .options(RunOptions::new().batch_size(50))
///     .run(records)?;
/// ```
pub struct Bulk {
    runner: BulkRunner,
}

impl Bulk {
    /// Bind a destroy-shaped action to a data layer
    pub fn destroy(data_layer: Arc<dyn DataLayer>, action: Arc<Action>) -> Self {
        Bulk {
            runner: BulkRunner::new(data_layer, action),
        }
    }

    /// Attach the policy engine
    #[must_use]
    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.runner = self.runner.authorizer(authorizer);
        self
    }

    /// Attach the notification sink
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.runner = self.runner.notifier(notifier);
        self
    }

    /// Set the run options
    #[must_use]
    pub fn options(mut self, options: RunOptions) -> Self {
        self.runner = self.runner.options(options);
        self
    }

    /// Set the action input, cast into every changeset during preparation
    #[must_use]
    pub fn input(mut self, input: BTreeMap<String, Value>) -> Self {
        self.runner = self.runner.input(input);
        self
    }

    /// Run over a record stream and aggregate the outcome
    pub fn run<I>(self, records: I) -> Result<BulkResult>
    where
        I: IntoIterator<Item = Record>,
    {
        Ok(self.runner.run(records)?)
    }

    /// Run a declarative query, preferring the atomic path
    pub fn run_query(self, query: &TargetQuery) -> Result<BulkResult> {
        Ok(self.runner.run_query(query)?)
    }

    /// Run over a record stream, yielding results lazily
    pub fn stream<I>(self, records: I) -> Result<BulkStream>
    where
        I: Iterator<Item = Record> + Send + 'static,
    {
        Ok(self.runner.stream(records)?)
    }

    /// Run a declarative query, yielding results lazily
    pub fn stream_query(self, query: &TargetQuery) -> Result<BulkStream> {
        Ok(self.runner.stream_query(query)?)
    }
}
