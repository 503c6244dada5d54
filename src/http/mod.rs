//! Request execution with per-call options, timeout-only retries and a
//! uniform status/body result.
//!
//! # Structure
//!
//! - `request` - `Method`, `RequestOptions` and `Request`
//! - `response` - immutable status/body pair
//! - `error` - `HttpError`, carrying the URL and attempt count
//! - `uri` - `{name}` placeholder expansion
//! - `retry` - bounded retry loop on timed-out attempts
//! - `transport` - single-attempt seam and the reqwest implementation
//! - `executor` - `RequestExecutor`, tying the pieces together

mod error;
mod executor;
mod request;
mod response;
mod retry;
mod transport;
pub mod uri;

pub use error::HttpError;
pub use executor::RequestExecutor;
pub use request::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS, Method, Request, RequestOptions};
pub use response::Response;
pub use retry::with_retry;
pub use transport::{AttemptError, PreparedRequest, ReqwestTransport, Transport, classify_error};
