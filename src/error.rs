//! Unified error type for Scythe
//!
//! Wraps the layered error taxonomy behind one enum for callers that do not
//! care which tier a failure came from. Per-record errors stay inside
//! [`scythe_core::BulkResult`]; this type only covers failures of the run
//! itself.

use thiserror::Error;

/// All Scythe run-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid option combination, rejected before any work started
    #[error("configuration: {0}")]
    Config(#[from] scythe_core::ConfigError),

    /// Data-layer failure outside per-record accounting
    #[error("data layer: {0}")]
    DataLayer(#[from] scythe_core::CoreError),
}

/// Result type for Scythe operations
pub type Result<T> = std::result::Result<T, Error>;
