//! Retry loop for request attempts, keyed on timeout classification.

use log::{debug, error, warn};

use super::error::HttpError;
use super::transport::AttemptError;

/// Runs `operation` until it succeeds, fails with a non-timeout error, or
/// times out with no retries left.
///
/// A call with `max_retries = n` makes at most `n + 1` attempts. Attempts
/// follow each other immediately. On success the value is returned together
/// with the number of attempts it took; on failure the attempt count is
/// recorded in the returned [`HttpError`].
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    url: &str,
    max_retries: u32,
    mut operation: F,
) -> Result<(T, u32), HttpError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptError>>,
{
    let total = max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok((value, attempt)),
            Err(AttemptError::Timeout(message)) if attempt < total => {
                warn!(
                    "{}: attempt {}/{} to {} timed out ({}), retrying...",
                    operation_name, attempt, total, url, message
                );
            }
            Err(e @ AttemptError::Timeout(_)) => {
                error!(
                    "{}: {} still timing out after {} attempt(s): {}",
                    operation_name, url, attempt, e
                );
                return Err(e.into_http_error(url, attempt));
            }
            Err(e) => {
                debug!("{}: non-retryable error from {}: {}", operation_name, url, e);
                return Err(e.into_http_error(url, attempt));
            }
        }
    }
}
