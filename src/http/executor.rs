//! Request executor: prepares a request once, then drives attempts through a
//! [`Transport`] under the retry policy.

use log::{debug, info};
use serde::de::DeserializeOwned;

use super::error::HttpError;
use super::request::{Request, RequestOptions};
use super::response::Response;
use super::retry::with_retry;
use super::transport::{PreparedRequest, ReqwestTransport, Transport};
use super::uri;
use crate::config::ExecutorConfig;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Issues requests and returns uniform results.
///
/// Holds no per-call state: each call prepares its own request and every
/// attempt goes through a fresh transport connection.
#[derive(Debug, Clone)]
pub struct RequestExecutor<T: Transport = ReqwestTransport> {
    transport: T,
    config: ExecutorConfig,
}

impl RequestExecutor<ReqwestTransport> {
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_transport(ReqwestTransport, config)
    }
}

impl Default for RequestExecutor<ReqwestTransport> {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl<T: Transport> RequestExecutor<T> {
    pub fn with_transport(transport: T, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    /// Executes `request` and returns its status and body, whatever the status.
    ///
    /// Timed-out attempts are retried up to `request.options.max_retries`
    /// times. Any other failure is returned immediately.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: &Request) -> Result<Response, HttpError> {
        let prepared = self.prepare(request)?;
        let (response, _) = self.send(&prepared, request.options.max_retries).await?;
        Ok(response)
    }

    /// Executes `request` and decodes a JSON body into `U`.
    ///
    /// Returns `Some` only for HTTP 200 with a non-empty body. Other statuses
    /// below 400 (201, 204, redirects) yield `None`. Statuses from 400 up are
    /// reported as [`HttpError::Status`].
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute_json<U: DeserializeOwned>(
        &self,
        request: &Request,
    ) -> Result<Option<U>, HttpError> {
        let prepared = self.prepare(request)?;
        let (response, attempts) = self.send(&prepared, request.options.max_retries).await?;
        decode_result(&prepared.url, attempts, response)
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.execute(&Request::get(url).with_options(options)).await
    }

    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.execute(&Request::post(url).with_options(options)).await
    }

    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.execute(&Request::put(url).with_options(options)).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.execute(&Request::delete(url).with_options(options)).await
    }

    pub async fn get_json<U: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<U>, HttpError> {
        self.execute_json(&Request::get(url).with_options(options))
            .await
    }

    pub async fn post_json<U: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<U>, HttpError> {
        self.execute_json(&Request::post(url).with_options(options))
            .await
    }

    /// Expands the URL, validates timeouts, encodes the body and merges
    /// headers. Failures here happen before any attempt.
    fn prepare(&self, request: &Request) -> Result<PreparedRequest, HttpError> {
        let options = &request.options;
        let url = uri::expand(&request.url, &options.uri_variables).map_err(|message| {
            HttpError::Transport {
                url: request.url.clone(),
                attempts: 0,
                message,
            }
        })?;

        if options.connect_timeout_ms == 0 || options.read_timeout_ms == 0 {
            return Err(HttpError::Transport {
                url,
                attempts: 0,
                message: format!(
                    "timeouts must be positive (connect {}ms, read {}ms)",
                    options.connect_timeout_ms, options.read_timeout_ms
                ),
            });
        }

        let body = match options.encoded_body() {
            Ok(body) => body.map(str::to_string),
            Err(message) => {
                return Err(HttpError::Serialization {
                    url,
                    attempts: 0,
                    message,
                });
            }
        };

        let mut headers = vec![("user-agent".to_string(), self.config.user_agent.clone())];
        headers = merge_headers(headers, &self.config.default_headers);
        if body.is_some() {
            headers = merge_headers(headers, [("content-type", JSON_CONTENT_TYPE)]);
        }
        headers = merge_headers(headers, &options.headers);

        Ok(PreparedRequest {
            method: request.method,
            url,
            headers,
            body,
            connect_timeout: options.connect_timeout(),
            read_timeout: options.read_timeout(),
        })
    }

    async fn send(
        &self,
        prepared: &PreparedRequest,
        max_retries: u32,
    ) -> Result<(Response, u32), HttpError> {
        let header_names: Vec<&str> = prepared.headers.iter().map(|(k, _)| k.as_str()).collect();
        info!(
            "{} request, url: {}, headers: {:?}, connect timeout: {:?}, read timeout: {:?}, retries: {}",
            prepared.method,
            prepared.url,
            header_names,
            prepared.connect_timeout,
            prepared.read_timeout,
            max_retries
        );

        let operation_name = format!("{} request", prepared.method);
        let (response, attempts) = with_retry(&operation_name, &prepared.url, max_retries, || {
            self.transport.send(prepared)
        })
        .await?;

        info!(
            "Response for {} request on {}: {} after {} attempt(s)",
            prepared.method, prepared.url, response, attempts
        );
        Ok((response, attempts))
    }
}

/// Applies `overrides` on top of `base`. A header in `overrides` replaces
/// every `base` entry with the same name, compared case-insensitively.
fn merge_headers<I, K, V>(mut base: Vec<(String, String)>, overrides: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (name, value) in overrides {
        let name = name.as_ref();
        base.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        base.push((name.to_string(), value.as_ref().to_string()));
    }
    base
}

/// Only HTTP 200 with a body produces a value. Any other status below 400 is
/// "no result", which existing callers rely on.
fn decode_result<U: DeserializeOwned>(
    url: &str,
    attempts: u32,
    response: Response,
) -> Result<Option<U>, HttpError> {
    if !response.is_success() {
        return Err(HttpError::Status {
            url: url.to_string(),
            attempts,
            status: response.status(),
            body: response.into_body(),
        });
    }

    if response.status() != 200 || response.body().trim().is_empty() {
        debug!("HTTP {} from {}: no result to decode", response.status(), url);
        return Ok(None);
    }

    serde_json::from_str(response.body())
        .map(Some)
        .map_err(|e| HttpError::Serialization {
            url: url.to_string(),
            attempts,
            message: format!("failed to decode response body: {}", e),
        })
}
