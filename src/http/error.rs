//! Error taxonomy for executed requests.

use thiserror::Error;

/// Errors propagated out of [`RequestExecutor`](super::RequestExecutor).
///
/// Every variant carries the expanded URL and the number of attempts that
/// were made, so callers can log a failure without threading extra context.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connect or read timeout exceeded on the last permitted attempt.
    #[error("request to {url} timed out after {attempts} attempt(s): {message}")]
    Timeout {
        url: String,
        attempts: u32,
        message: String,
    },

    /// DNS failure, refused connection, malformed URL, invalid request
    /// parameters or I/O error mid-transfer. Never retried.
    #[error("request to {url} failed after {attempts} attempt(s): {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Request body could not be encoded, or the response body could not be
    /// decoded into the requested shape.
    #[error("JSON serialization failed for {url} after {attempts} attempt(s): {message}")]
    Serialization {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Typed calls only: the server answered with a client or server error.
    #[error("request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        attempts: u32,
        status: u16,
        body: String,
    },
}

impl HttpError {
    pub fn url(&self) -> &str {
        match self {
            HttpError::Timeout { url, .. }
            | HttpError::Transport { url, .. }
            | HttpError::Serialization { url, .. }
            | HttpError::Status { url, .. } => url,
        }
    }

    /// Number of attempts made before the error surfaced. Zero means the
    /// request was rejected before anything was sent.
    pub fn attempts(&self) -> u32 {
        match self {
            HttpError::Timeout { attempts, .. }
            | HttpError::Transport { attempts, .. }
            | HttpError::Serialization { attempts, .. }
            | HttpError::Status { attempts, .. } => *attempts,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }
}
