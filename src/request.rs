//! Retrying request executor
//!
//! Every HTTP call in the crate goes through [`execute_with_retry`]: bounded
//! attempts with exponential backoff, and a [`RequestOutcome`] result shape
//! that never lets an ordinary network or HTTP failure escape as an error.
//! A 404 on the final attempt is normalized to a fixed message so callers
//! can treat it as "endpoint not supported" rather than a transient failure.

use crate::config::RetryConfig;
use rand::Rng;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, warn};

/// Fixed failure message for a 404 response, used by callers to recognize
/// "endpoint not found" as a skip rather than a hard failure
pub const ENDPOINT_NOT_FOUND: &str = "Task endpoint not found";

/// HTTP methods the executor supports
///
/// The closed enum makes "unsupported method" unrepresentable; there is no
/// runtime fallback branch to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET (payload ignored)
    Get,
    /// HTTP POST with a JSON payload
    Post,
}

/// Uniform result shape for all network operations
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
    /// The request returned a 2xx status; `body` is the decoded response
    /// (JSON when parseable, the raw text otherwise)
    Success {
        /// Decoded response body
        body: Value,
    },
    /// The request failed on every attempt
    Failure {
        /// Message from the final attempt
        message: String,
        /// HTTP status of the final attempt, when one was received
        status: Option<u16>,
    },
}

impl RequestOutcome {
    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }

    /// The HTTP status of the final failed attempt, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestOutcome::Success { .. } => None,
            RequestOutcome::Failure { status, .. } => *status,
        }
    }
}

/// One attempt's failure, before outcome normalization
struct AttemptFailure {
    message: String,
    status: Option<u16>,
}

/// Execute a request with bounded retries and exponential backoff
///
/// Attempts the call up to `retry.max_attempts` times. Any failure — network
/// error, timeout, non-2xx status — triggers a warn log and a backoff sleep,
/// except after the final attempt, which resolves to a
/// [`RequestOutcome::Failure`]. The backoff is multiplied by
/// `retry.backoff_multiplier` after every failed attempt and capped at
/// `retry.max_backoff`; optional jitter adds up to one extra backoff span.
pub async fn execute_with_retry(
    client: &Client,
    method: Method,
    url: &str,
    payload: Option<&Value>,
    headers: HeaderMap,
    retry: &RetryConfig,
) -> RequestOutcome {
    let attempts = retry.max_attempts.max(1);
    let mut backoff = retry.initial_backoff;
    let mut last_failure = AttemptFailure {
        message: "no attempts made".to_string(),
        status: None,
    };

    for attempt in 1..=attempts {
        match execute_once(client, method, url, payload, headers.clone()).await {
            Ok(body) => return RequestOutcome::Success { body },
            Err(failure) => {
                if attempt < attempts {
                    warn!(
                        method = ?method,
                        url = %url,
                        attempt,
                        max_attempts = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %failure.message,
                        "request failed, retrying"
                    );
                    let delay = if retry.jitter {
                        add_jitter(backoff)
                    } else {
                        backoff
                    };
                    tokio::time::sleep(delay).await;
                    backoff = Duration::from_secs_f64(
                        backoff.as_secs_f64() * retry.backoff_multiplier,
                    )
                    .min(retry.max_backoff);
                }
                last_failure = failure;
            }
        }
    }

    error!(
        method = ?method,
        url = %url,
        status = ?last_failure.status,
        error = %last_failure.message,
        "request failed after all attempts"
    );

    if last_failure.status == Some(404) {
        return RequestOutcome::Failure {
            message: ENDPOINT_NOT_FOUND.to_string(),
            status: Some(404),
        };
    }
    RequestOutcome::Failure {
        message: last_failure.message,
        status: last_failure.status,
    }
}

/// Issue a single request and decode the body
///
/// A non-2xx status is a failure carrying that status. The body is decoded
/// as JSON when possible and kept as a raw string otherwise, so a malformed
/// body never fails a successful response.
async fn execute_once(
    client: &Client,
    method: Method,
    url: &str,
    payload: Option<&Value>,
    headers: HeaderMap,
) -> Result<Value, AttemptFailure> {
    let builder = match method {
        Method::Get => client.get(url),
        Method::Post => {
            let mut post = client.post(url);
            if let Some(payload) = payload {
                post = post.json(payload);
            }
            post
        }
    };

    let response = builder.headers(headers).send().await.map_err(|e| {
        AttemptFailure {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| AttemptFailure {
        message: e.to_string(),
        status: Some(status.as_u16()),
    })?;

    if !status.is_success() {
        return Err(AttemptFailure {
            message: format!("HTTP status {}", status.as_u16()),
            status: Some(status.as_u16()),
        });
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Add random jitter to a backoff delay
///
/// Uniform between 0% and 100% of the delay, so the jittered value lands in
/// `[delay, 2 * delay]`.
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
