//! `biodbs-fetch` is the shared fetch layer for biological-database clients:
//! per-host rate limiting, retrying request execution, and chunked batch
//! scheduling, so that individual vendor crates (KEGG, BioMart, QuickGO,
//! UniProt, ...) only describe their endpoints.
//!
//! "Hello world" example:
//! ```no_run
//! use biodbs_fetch::{RequesterBuilder, Result};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let requester = RequesterBuilder::default().requester()?;
//!     requester
//!         .limiter()
//!         .set_rate("rest.kegg.jp", 3.0);
//!
//!     let response = requester
//!         .get(Url::parse("https://rest.kegg.jp/list/pathway/hsa").unwrap())
//!         .await?;
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```
//!
//! For bulk fetches, split the input with [`batch::chunk`] (or
//! [`batch::adaptive_chunk`] for encoded-length limits), run the chunk
//! requests through [`Requester::execute_batch`], and walk the
//! order-preserving outcome:
//! ```no_run
//! use biodbs_fetch::{RequestSpec, RequesterBuilder, Result, batch};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let requester = RequesterBuilder::default().requester()?;
//!     let ids: Vec<String> = (0..1200).map(|i| format!("ENSG{i:011}")).collect();
//!
//!     let base = Url::parse("https://rest.ensembl.org/lookup").unwrap();
//!     let specs = batch::chunk(&ids, 500)
//!         .into_iter()
//!         .map(|chunk| RequestSpec::get(base.clone()).with_param("ids", chunk.join(",")))
//!         .collect();
//!
//!     let outcome = requester.execute_batch(specs, 4, true).await?;
//!     for (index, result) in outcome.results().iter().enumerate() {
//!         match result.failure() {
//!             None => println!("chunk {index} fetched"),
//!             Some(error) => eprintln!("chunk {index} failed: {error}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_panics_doc)]
// #![deny(missing_docs)]

pub mod batch;
pub mod cache;
pub mod ratelimit;

mod requester;
mod retry;
mod types;

#[cfg(test)]
#[macro_use]
pub mod test_utils;

pub use requester::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, Requester, RequesterBuilder};
pub use retry::{
    DEFAULT_EXPONENTIAL_BASE, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRYABLE_STATUS_CODES, RetryPolicy,
};
pub use types::{ErrorKind, RequestSpec, Response, Result};
