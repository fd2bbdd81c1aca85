//! Bounded-concurrency execution of chunked requests.
//!
//! One logical request ("fetch these 5,000 gene IDs") fans out into many
//! small HTTP calls. [`run`] executes them on a bounded pool and collects an
//! order-preserving [`BatchOutcome`], capturing individual failures instead
//! of letting one chunk abort the rest.
//!
//! Paginated APIs that only reveal their total result count on the first
//! page compose this as first-chunk-then-rest: issue page one directly,
//! compute the remaining page numbers from the reported total, and submit
//! those through [`run`].

use futures::stream::{self, StreamExt};
use std::future::Future;

use crate::types::{ErrorKind, Result};

/// Default number of concurrent workers per batch call
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// The outcome of one chunk: its decoded payload, or the captured error.
///
/// Failures are data here, not raised exceptions; a batch with
/// `return_partial_failures` records them in their slot and carries on.
#[derive(Debug)]
pub enum ChunkResult<T> {
    /// The chunk's payload
    Success(T),
    /// The typed error that exhausted or rejected this chunk
    Failure(ErrorKind),
}

impl<T> ChunkResult<T> {
    /// Whether this chunk succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, if this chunk succeeded
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// The captured error, if this chunk failed
    #[must_use]
    pub fn failure(&self) -> Option<&ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

/// The ordered results of one batch call.
///
/// Slot `i` always corresponds to input task `i`, regardless of the order in
/// which tasks completed.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    results: Vec<ChunkResult<T>>,
}

impl<T> BatchOutcome<T> {
    /// All per-chunk results, in input order
    #[must_use]
    pub fn results(&self) -> &[ChunkResult<T>] {
        &self.results
    }

    /// Consume the outcome, yielding the per-chunk results in input order
    #[must_use]
    pub fn into_results(self) -> Vec<ChunkResult<T>> {
        self.results
    }

    /// Number of chunks in the batch
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch contained no chunks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of chunks that succeeded
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of chunks that failed
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Indices of the chunks that failed, in input order
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| (!result.is_success()).then_some(index))
            .collect()
    }
}

/// Execute `tasks` on a bounded pool of at most `max_concurrency` concurrent
/// workers.
///
/// With `return_partial_failures`, a failing task is recorded in its result
/// slot and the remaining tasks continue; the returned outcome always has
/// the same length and order as `tasks`. Without it, the first failure is
/// returned directly and the remaining tasks are cancelled best-effort
/// (pending futures are dropped; a request already sent at the transport
/// layer may still complete on the server, but its result is discarded).
///
/// A `max_concurrency` of zero is treated as one.
///
/// # Errors
///
/// Only in the `return_partial_failures = false` mode: the first task error
/// is propagated as-is.
pub async fn run<T, Fut>(
    tasks: Vec<Fut>,
    max_concurrency: usize,
    return_partial_failures: bool,
) -> Result<BatchOutcome<T>>
where
    Fut: Future<Output = Result<T>>,
{
    let total = tasks.len();
    let mut slots: Vec<Option<ChunkResult<T>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);

    let mut completions = stream::iter(
        tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| async move { (index, task.await) }),
    )
    .buffer_unordered(max_concurrency.max(1));

    while let Some((index, result)) = completions.next().await {
        match result {
            Ok(payload) => slots[index] = Some(ChunkResult::Success(payload)),
            Err(error) if return_partial_failures => {
                log::warn!("Chunk {index} failed: {error}");
                slots[index] = Some(ChunkResult::Failure(error));
            }
            // Dropping the stream cancels everything still pending
            Err(error) => return Err(error),
        }
    }

    let results = slots
        .into_iter()
        .map(|slot| slot.expect("every task fills exactly one result slot"))
        .collect();

    Ok(BatchOutcome { results })
}
