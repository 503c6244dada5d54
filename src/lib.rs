//! Small HTTP helpers: one executor for GET/POST/PUT/DELETE with optional
//! headers, JSON bodies, connect/read timeouts and a bounded retry on
//! timed-out attempts.

pub mod config;
pub mod http;

pub use config::ExecutorConfig;
pub use http::{HttpError, Method, Request, RequestExecutor, RequestOptions, Response};
