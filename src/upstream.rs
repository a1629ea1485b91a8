//! Shared plumbing for calls to upstream HTTP services.
//!
//! Every provider adapter funnels its requests through [`send_with_retry`], which applies a
//! small bounded retry with exponential backoff on transport failures and on `429`/`5xx`
//! responses. Anything else is returned to the caller untouched.

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Retry budget applied to one logical upstream call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Policy with the default backoff.
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_BACKOFF,
        }
    }

    /// Policy that never retries.
    pub const fn none() -> Self {
        Self::new(0)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(8))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Send a request built by `build`, retrying transient failures according to `policy`.
///
/// `build` is invoked once per attempt because a `RequestBuilder` is consumed by `send`.
pub async fn send_with_retry<F>(
    policy: RetryPolicy,
    label: &'static str,
    build: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match build().send().await {
            Ok(response) if is_transient_status(response.status()) && attempt < policy.max_retries => {
                tracing::debug!(
                    upstream = label,
                    status = %response.status(),
                    attempt,
                    "Transient upstream status; retrying"
                );
            }
            Err(error) if is_transient_error(&error) && attempt < policy.max_retries => {
                tracing::debug!(
                    upstream = label,
                    error = %error,
                    attempt,
                    "Transient upstream error; retrying"
                );
            }
            outcome => return outcome,
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
        attempt += 1;
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}
