//! Request description: method, URL and the options every call can set.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Connect timeout used when the caller does not set one.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Read timeout used when the caller does not set one.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 60_000;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a caller may tune on a single call. Defaults: no headers, no
/// body, 10s connect timeout, 60s read timeout, no retries, no URI variables.
#[derive(Debug)]
pub struct RequestOptions {
    /// Caller headers, applied on top of the executor defaults.
    pub headers: BTreeMap<String, String>,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Extra attempts allowed after a timed-out attempt.
    pub max_retries: u32,
    /// Values for `{name}` placeholders in the URL.
    pub uri_variables: BTreeMap<String, String>,
    // Encoded eagerly; an encoding failure is reported when the request runs.
    body: Option<serde_json::Result<String>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_retries: 0,
            uri_variables: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body, encoded as JSON text.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_string(body));
        self
    }

    pub fn with_connect_timeout_ms(mut self, millis: u64) -> Self {
        self.connect_timeout_ms = millis;
        self
    }

    pub fn with_read_timeout_ms(mut self, millis: u64) -> Self {
        self.read_timeout_ms = millis;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_uri_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.uri_variables.insert(name.into(), value.into());
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// The encoded body, or the encoder's message if encoding failed.
    pub(crate) fn encoded_body(&self) -> Result<Option<&str>, String> {
        match &self.body {
            None => Ok(None),
            Some(Ok(text)) => Ok(Some(text)),
            Some(Err(e)) => Err(e.to_string()),
        }
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// One logical call: method, URL template and options.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Absolute URL. May carry a query string and `{name}` placeholders.
    pub url: String,
    pub options: RequestOptions,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}
