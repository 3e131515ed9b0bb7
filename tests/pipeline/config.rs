//! Configuration rejection: invalid combinations fail before any work

use std::sync::Arc;

use crate::common::*;
use scythe::{Bulk, ConfigError, Error, RunOptions, TransactionScope};

#[test]
fn whole_run_transaction_rejects_streaming() {
    let layer = Arc::new(MemoryLayer::new());
    let err = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().transaction(TransactionScope::All))
        .stream(tickets(5).into_iter())
        .err()
        .unwrap();

    assert_eq!(err, Error::Config(ConfigError::StreamInsideTransaction));
    // zero side effects
    assert_eq!(layer.destroyed(), 0);
    assert_eq!(*layer.transactions_opened.lock(), 0);
}

#[test]
fn sorted_rejects_streaming() {
    let layer = Arc::new(MemoryLayer::new());
    let err = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().sorted())
        .stream(tickets(5).into_iter())
        .err()
        .unwrap();

    assert_eq!(err, Error::Config(ConfigError::SortedStream));
    assert_eq!(layer.destroyed(), 0);
}

#[test]
fn stop_on_error_rejects_streaming() {
    let layer = Arc::new(MemoryLayer::new());
    let err = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().stop_on_error())
        .stream(tickets(5).into_iter())
        .err()
        .unwrap();

    assert_eq!(err, Error::Config(ConfigError::StopOnErrorStream));
    assert_eq!(layer.destroyed(), 0);
}

#[test]
fn zero_batch_size_is_rejected() {
    let layer = Arc::new(MemoryLayer::new());
    let err = Bulk::destroy(layer.clone(), plain_action())
        .options(RunOptions::new().batch_size(0))
        .run(tickets(5))
        .err()
        .unwrap();

    assert_eq!(err, Error::Config(ConfigError::ZeroBatchSize));
    assert_eq!(layer.destroyed(), 0);
}

#[test]
fn aggregate_runs_accept_stream_incompatible_options() {
    // the same options are fine when no stream is requested
    let layer = Arc::new(MemoryLayer::new());
    let result = Bulk::destroy(layer, plain_action())
        .options(
            RunOptions::new()
                .transaction(TransactionScope::All)
                .sorted()
                .stop_on_error(),
        )
        .run(tickets(5));
    assert!(result.is_ok());
}
