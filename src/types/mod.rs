//! Shared types: the error taxonomy and the request/response descriptors
//! exchanged between the vendor layer and this core.

pub(crate) mod error;
mod request;
mod response;

pub use error::ErrorKind;
pub use request::RequestSpec;
pub use response::Response;

/// The crate-wide result type
pub type Result<T> = std::result::Result<T, ErrorKind>;
