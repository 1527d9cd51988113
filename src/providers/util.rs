use anyhow::{Error, anyhow};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async HTTP request with configurable attempts and delays.
///
/// Transport errors and 5xx/429 responses are retried; any other response is handed
/// back to the caller as-is.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
pub async fn with_retry<F, Fut>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<reqwest::Response, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(response) if is_transient(response.status()) => {
                anyhow!("HTTP error: {}", response.status())
            }
            Ok(response) => return Ok(response),
            Err(err) => Error::from(err),
        };
        if attempt > retries {
            return Err(err);
        }
        debug!(
            "Attempt {}/{} failed: {}. Retrying...",
            attempt, retries, err
        );
        attempt += 1;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}
