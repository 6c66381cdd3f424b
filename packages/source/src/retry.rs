//! Retry middleware for transient HTTP errors.
//!
//! Every request the client makes goes through a [`RetryPolicy`], which is
//! injected when the client is built rather than hard-coded per call:
//!
//! ```ignore
//! let policy = RetryPolicy::default();
//! let terms: Vec<TermRecord> = retry::send_json(&policy, || http.get(&url)).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How often and how patiently a request is retried.
///
/// Retries connection failures, timeouts, HTTP 429 and HTTP 5xx. Other
/// 4xx responses are permanent and returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based): `min_delay` doubled per
    /// earlier retry, capped at `max_delay`.
    #[must_use]
    pub fn delay_before(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(31);
        self.min_delay
            .saturating_mul(1u32 << doublings)
            .clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Sends the request built by `build_request`, retrying transient
    /// failures. Returns the first 2xx/3xx response.
    ///
    /// The closure is called once per attempt since builders are consumed
    /// by `.send()`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails permanently or keeps
    /// failing until the attempts run out.
    #[allow(clippy::future_not_send)]
    pub async fn send<F>(&self, build_request: F) -> Result<reqwest::Response, SourceError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            let last = attempt >= attempts;

            match build_request().send().await {
                Err(e) => {
                    if last || !is_transient(&e) {
                        return Err(SourceError::Http(e));
                    }
                    log::warn!("  transient error: {e}");
                }
                Ok(response) => {
                    let status = response.status();
                    let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();

                    if status.is_client_error() || status.is_server_error() {
                        if last || !retryable {
                            return Err(SourceError::Status {
                                url: response.url().to_string(),
                                status,
                            });
                        }
                        log::warn!("  HTTP {status} from {}", response.url());
                    } else {
                        return Ok(response);
                    }
                }
            }

            let delay = self.delay_before(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", attempts - 1);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Sends a request and decodes the JSON body into `T`.
///
/// A body that cannot be read counts as a transient failure and re-fetches
/// the request within the same attempt budget. A body that is read but
/// does not match `T` is a [`SourceError::Decode`] and is not retried.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// body does not decode.
#[allow(clippy::future_not_send)]
pub async fn send_json<T, F>(policy: &RetryPolicy, build_request: F) -> Result<T, SourceError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let response = policy.send(&build_request).await?;
        let url = response.url().to_string();

        match response.text().await {
            Ok(text) => {
                return serde_json::from_str(&text).map_err(|e| {
                    let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
                    log::error!(
                        "Response did not match the expected shape.\n  \
                         url: {url}\n  \
                         error: {e}\n  \
                         body preview: {preview}"
                    );
                    SourceError::Decode {
                        url,
                        message: e.to_string(),
                    }
                });
            }
            Err(e) => {
                if attempt >= attempts {
                    log::error!("Response body read failed, giving up.\n  url: {url}\n  error: {e}");
                    return Err(SourceError::Http(e));
                }
                let delay = policy.delay_before(attempt);
                log::warn!(
                    "Response body read failed (body retry {attempt}/{}), re-fetching in {delay:?}...\n  \
                     url: {url}\n  \
                     error: {e}",
                    attempts - 1,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
