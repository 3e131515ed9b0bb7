//! The stream partitioner
//!
//! Consumes the record source, tags every element with its 0-based original
//! stream position, and groups elements into fixed-size batches. Read
//! failures from a query re-read travel inside the batch as `Err` entries so
//! they surface through the normal error accounting instead of aborting the
//! run.

use scythe_core::{CoreError, Record};

/// One partitioned element: original position plus the record or the read
/// failure that took its place
pub(crate) type BatchEntry = (usize, Result<Record, CoreError>);

/// Fixed-size batching over a fallible record source
pub(crate) struct Partitioner<I> {
    source: I,
    batch_size: usize,
    next_index: usize,
}

impl<I> Partitioner<I>
where
    I: Iterator<Item = Result<Record, CoreError>>,
{
    /// `batch_size` must already be the effective size (forced to 1 for
    /// manual executors without bulk support).
    pub fn new(source: I, batch_size: usize) -> Self {
        debug_assert!(batch_size > 0);
        Partitioner {
            source,
            batch_size,
            next_index: 0,
        }
    }
}

impl<I> Iterator for Partitioner<I>
where
    I: Iterator<Item = Result<Record, CoreError>>,
{
    type Item = Vec<BatchEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.source.next() {
                Some(entry) => {
                    batch.push((self.next_index, entry));
                    self.next_index += 1;
                }
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
