//! Merging chunk results into one logical result.
//!
//! Successful chunks are either concatenated in memory ([`concat`]) or
//! written incrementally to a storage sink ([`stream_to_storage`]) when the
//! full result would not fit comfortably in memory. Either way, the failures
//! recorded by the scheduler travel with the merged result; they are never
//! silently dropped.

use std::path::PathBuf;

use super::scheduler::{BatchOutcome, ChunkResult};
use crate::types::{ErrorKind, Result};

/// A payload that can absorb another payload of the same shape.
///
/// Vendor crates implement this for their tabular types; `Vec` and `String`
/// are covered out of the box for record lists and raw TSV bodies.
pub trait Merge {
    /// Append `other` onto `self`, preserving order
    fn merge(&mut self, other: Self);
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, mut other: Self) {
        self.append(&mut other);
    }
}

impl Merge for String {
    fn merge(&mut self, other: Self) {
        self.push_str(&other);
    }
}

/// One failed chunk: its input index and the captured error
#[derive(Debug)]
pub struct BatchFailure {
    /// Index of the failed chunk in the input task list
    pub index: usize,
    /// The error that exhausted or rejected the chunk
    pub error: ErrorKind,
}

/// The merged result of a batch, alongside the chunks that failed
#[derive(Debug)]
pub struct Aggregated<T> {
    /// The ordered merge of all successful payloads; `None` if every chunk
    /// failed or the batch was empty
    pub merged: Option<T>,
    /// The failed chunks, in input order
    pub failed: Vec<BatchFailure>,
}

impl<T> Aggregated<T> {
    /// Whether every chunk contributed to the merged result
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Merge the successful payloads of `outcome` in input order.
pub fn concat<T: Merge>(outcome: BatchOutcome<T>) -> Aggregated<T> {
    let mut merged: Option<T> = None;
    let mut failed = Vec::new();

    for (index, result) in outcome.into_results().into_iter().enumerate() {
        match result {
            ChunkResult::Success(payload) => match merged.as_mut() {
                Some(merged) => merged.merge(payload),
                None => merged = Some(payload),
            },
            ChunkResult::Failure(error) => failed.push(BatchFailure { index, error }),
        }
    }

    Aggregated { merged, failed }
}

/// A destination for streamed batch payloads, provided by the storage layer.
pub trait StorageSink<T> {
    /// Write one chunk's payload
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write_batch(&mut self, payload: T) -> Result<()>;

    /// Flush buffered writes and return the path of the stored result
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&mut self) -> Result<PathBuf>;
}

/// The result of streaming a batch to storage
#[derive(Debug)]
pub struct Streamed {
    /// Where the sink stored the merged result
    pub path: PathBuf,
    /// The failed chunks, in input order
    pub failed: Vec<BatchFailure>,
}

impl Streamed {
    /// Whether every chunk was written
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write each successful payload of `outcome` to `sink` in input order,
/// without holding more than one payload at a time.
///
/// # Errors
///
/// Returns the sink's error if a write or the final flush fails. Chunk
/// failures are not errors here; they are reported in the returned
/// [`Streamed`].
pub fn stream_to_storage<T, S>(outcome: BatchOutcome<T>, sink: &mut S) -> Result<Streamed>
where
    S: StorageSink<T>,
{
    let mut failed = Vec::new();

    for (index, result) in outcome.into_results().into_iter().enumerate() {
        match result {
            ChunkResult::Success(payload) => sink.write_batch(payload)?,
            ChunkResult::Failure(error) => failed.push(BatchFailure { index, error }),
        }
    }

    let path = sink.flush()?;
    Ok(Streamed { path, failed })
}
