//! Chunking, bounded-concurrency scheduling, and result aggregation.
//!
//! The batch pipeline: an oversized input is split by
//! [`chunk`]/[`adaptive_chunk`], the per-chunk requests are executed by
//! [`run`] under a worker cap (each request going through the retrying,
//! rate-limited [`Requester`](crate::Requester)), and the order-preserving
//! [`BatchOutcome`] is merged by [`concat`] or written out incrementally by
//! [`stream_to_storage`].

mod aggregate;
mod chunk;
mod scheduler;

pub use aggregate::{Aggregated, BatchFailure, Merge, StorageSink, Streamed, concat, stream_to_storage};
pub use chunk::{adaptive_chunk, chunk};
pub use scheduler::{BatchOutcome, ChunkResult, DEFAULT_MAX_CONCURRENCY, run};
