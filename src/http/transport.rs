//! Single-attempt transport seam and its reqwest implementation.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use super::error::HttpError;
use super::request::Method;
use super::response::Response;

/// Why a single attempt failed. Only `Timeout` is eligible for a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Connect or read timeout exceeded.
    Timeout(String),
    /// Any other failure below the HTTP layer.
    Transport(String),
}

impl AttemptError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout(_))
    }

    pub(crate) fn into_http_error(self, url: &str, attempts: u32) -> HttpError {
        match self {
            AttemptError::Timeout(message) => HttpError::Timeout {
                url: url.to_string(),
                attempts,
                message,
            },
            AttemptError::Transport(message) => HttpError::Transport {
                url: url.to_string(),
                attempts,
                message,
            },
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Timeout(msg) => write!(f, "timed out: {}", msg),
            AttemptError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl StdError for AttemptError {}

/// A request with URL variables expanded, headers merged and body encoded.
/// This is exactly what goes on the wire for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl PreparedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Performs one attempt: open a connection, send, read the whole body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PreparedRequest) -> Result<Response, AttemptError>;
}

/// Transport backed by reqwest. Builds a new client for every attempt, so a
/// retry always opens a new connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<Response, AttemptError> {
        let url = reqwest::Url::parse(&request.url).map_err(|e| {
            AttemptError::Transport(format!("malformed URL {}: {}", request.url, e))
        })?;

        let client = Client::builder()
            .connect_timeout(request.connect_timeout)
            .read_timeout(request.read_timeout)
            .build()
            .map_err(classify_error)?;

        let mut builder = client.request(request.method.to_reqwest(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();

        // reqwest exposes one body stream for every status
        if status < 400 {
            debug!("HTTP {}: reading body from the response stream", status);
        } else {
            debug!("HTTP {}: reading body as error content", status);
        }

        let body = response.text().await.map_err(classify_error)?;
        Ok(Response::new(status, body))
    }
}

/// Maps a reqwest failure onto the retry classification.
pub fn classify_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() || has_timed_out_source(&error) {
        AttemptError::Timeout(describe(&error))
    } else {
        AttemptError::Transport(describe(&error))
    }
}

fn has_timed_out_source(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// The error message followed by its source chain.
fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
