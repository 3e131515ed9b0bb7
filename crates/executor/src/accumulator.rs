//! The run accumulator
//!
//! One [`RunAccumulator`] exists per run, owned by the coordinator. Workers
//! never hold a reference to it: each returns a [`WorkerOutcome`] and the
//! coordinator merges at well-defined join points. The error count and
//! success count are tracked unconditionally; the materialized lists honor
//! the caller's `return_*` gating at merge time so discarded data is never
//! collected twice.

use scythe_core::{MutationError, Notification, RunOptions, RunToken, SourcedRecord};

/// One worker's contribution for one batch
#[derive(Debug, Default)]
pub(crate) struct WorkerOutcome {
    /// Records destroyed by this batch, tagged with source indices
    ///
    /// Materialized only when the caller or a hook needs them; `destroyed`
    /// carries the success count regardless.
    pub records: Vec<SourcedRecord>,
    /// Count of destroyed records
    pub destroyed: usize,
    /// Errors accumulated by this batch
    pub errors: Vec<MutationError>,
    /// Notifications collected by this batch
    pub notifications: Vec<Notification>,
    /// Whether the batch ran to completion (false after rollback)
    pub completed: bool,
}

/// Run-scoped accumulator, merged from worker outcomes
#[derive(Debug)]
pub(crate) struct RunAccumulator {
    pub token: RunToken,
    pub records: Vec<SourcedRecord>,
    pub errors: Vec<MutationError>,
    pub notifications: Vec<Notification>,
    pub error_count: usize,
    pub success_count: usize,
    pub completed_batches: usize,
}

impl RunAccumulator {
    pub fn new(token: RunToken) -> Self {
        RunAccumulator {
            token,
            records: Vec::new(),
            errors: Vec::new(),
            notifications: Vec::new(),
            error_count: 0,
            success_count: 0,
            completed_batches: 0,
        }
    }

    /// Merge one worker outcome
    ///
    /// The only place accumulator state changes; never called concurrently.
    pub fn merge(&mut self, outcome: WorkerOutcome, options: &RunOptions) {
        self.error_count += outcome.errors.len();
        self.success_count += outcome.destroyed;
        if outcome.completed {
            self.completed_batches += 1;
        }
        if options.return_errors {
            self.errors.extend(outcome.errors);
        }
        if options.return_records {
            self.records.extend(outcome.records);
        }
        if options.return_notifications {
            self.notifications.extend(outcome.notifications);
        }
    }

    /// Discard successes after a whole-run rollback; errors stay
    pub fn discard_successes(&mut self) {
        self.records.clear();
        self.success_count = 0;
        self.notifications.clear();
    }
}
