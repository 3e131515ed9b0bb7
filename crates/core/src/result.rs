//! Aggregate and streamed run outcomes
//!
//! [`BulkResult`] is the final shape of a non-streamed run. `status` and
//! `error_count` are always populated; the record, error, and notification
//! lists are independently gated by the caller's `return_*` options —
//! "did we collect this" is decoupled from "does the caller want it".

use serde::{Deserialize, Serialize};

use crate::error::MutationError;
use crate::notification::Notification;
use crate::record::Record;

/// Classification of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every processed record committed
    Success,
    /// Some records committed, some failed
    PartialSuccess,
    /// Nothing committed (or nothing survived) and errors exist
    Error,
}

/// A record tagged with its original stream position
///
/// Workers emit these so the aggregator can recover source order under
/// concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedRecord {
    /// 0-based position in the original input stream
    pub source_index: usize,
    /// The materialized record
    pub record: Record,
}

/// Final result of a non-streamed bulk run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Run classification
    pub status: RunStatus,
    /// Destroyed records, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Record>>,
    /// Accumulated errors, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<MutationError>>,
    /// Number of errors, always populated regardless of `return_errors`
    pub error_count: usize,
    /// Collected notifications, present only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Notification>>,
}

impl BulkResult {
    /// Classify a run from its error count and surviving record count
    ///
    /// `Success` iff no errors; `Error` iff errors exist and no record
    /// survived; `PartialSuccess` otherwise.
    pub fn classify(error_count: usize, record_count: usize) -> RunStatus {
        if error_count == 0 {
            RunStatus::Success
        } else if record_count == 0 {
            RunStatus::Error
        } else {
            RunStatus::PartialSuccess
        }
    }

    /// Whether the run completed without errors
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// One element of a streamed run
///
/// The run accumulator is drained per batch when streaming: each batch's
/// records, errors, and (when requested) notifications are emitted in
/// processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A destroyed record
    Record(Record),
    /// A per-record error
    Error(MutationError),
    /// A collected notification
    Notification(Notification),
}
