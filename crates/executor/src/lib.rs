//! Run orchestration for the Scythe pipeline
//!
//! This crate schedules and executes bulk runs:
//! - [`BulkRunner`]: the entry point tying options, collaborators, and an
//!   action together
//! - atomic path selection (one pushed-down operation) vs. the streaming
//!   per-batch path
//! - the concurrency coordinator (bounded worker pool or sequential loop)
//! - the run accumulator, merged only at join points
//! - the result aggregator and the lazily-consumed [`BulkStream`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod accumulator;
mod aggregate;
mod atomic;
mod batch;
mod context;
mod coordinator;
mod dispatch;
mod partition;
mod post;
mod run;
mod stream;

pub use run::BulkRunner;
pub use stream::BulkStream;
