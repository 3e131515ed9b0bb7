//! Convenient imports for Scythe.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use scythe::prelude::*;
//!
//! let result = Bulk::destroy(data_layer, action).run(records)?;
//! ```

// Main entry point
pub use crate::pipeline::Bulk;

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use scythe_core::{
    Actor, BulkResult, Filter, MutationError, Notification, Record, RunOptions, RunStatus,
    StreamItem, TargetQuery, TransactionScope, Value,
};

// Action model
pub use scythe_engine::{Action, ArgumentSpec, Change, Changeset, Validation};

// Runner surface
pub use scythe_executor::{BulkRunner, BulkStream};
