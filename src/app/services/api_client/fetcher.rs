//! Resilient HTTP fetching with bounded retries
//!
//! Every request goes through [`ResilientFetcher::fetch`], which applies the
//! retry policy:
//!
//! - HTTP 429 is surfaced immediately as [`Error::RateLimited`]; the caller
//!   owns the wait
//! - other 4xx responses fail immediately as [`Error::Client`]
//! - timeouts, connection failures and 5xx responses are retried after
//!   `backoff_factor^attempt` backoff units (attempts are zero-indexed), up to
//!   `max_retries` retries, then reported as [`Error::Transport`]
//!
//! A successful body is decoded as JSON and returned untouched; business
//! validation happens downstream.

use crate::config::FetchConfig;
use crate::constants::{DEFAULT_RETRY_AFTER_SECS, MAX_BACKOFF_DELAY_SECS};
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Raw decoded API payload
pub type RawResponse = serde_json::Value;

/// HTTP GET client with retry, backoff and rate-limit handling
///
/// The inner `reqwest::Client` pools connections and is safe to share, so one
/// fetcher can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    backoff_factor: f64,
    backoff_unit: Duration,
}

/// Outcome of a single attempt that did not produce a final answer
enum AttemptFailure {
    Retryable {
        message: String,
        source: Option<reqwest::Error>,
    },
    Fatal(Error),
}

impl ResilientFetcher {
    /// Create a fetcher for `base_url` using the timeout and retry settings
    /// from `config`
    pub fn new(base_url: impl Into<String>, config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::transport("Failed to build HTTP client", Some(e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            backoff_unit: config.backoff_unit(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before the retry that follows zero-indexed `attempt`
    ///
    /// Saturates at [`MAX_BACKOFF_DELAY_SECS`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let max_delay = Duration::from_secs(MAX_BACKOFF_DELAY_SECS);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_unit.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(max_delay))
            .unwrap_or(max_delay)
    }

    /// Full URL for an endpoint relative to the base URL
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// GET `endpoint` with query `params`, retrying transient failures
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<RawResponse> {
        let url = self.url_for(endpoint);
        let total_attempts = self.max_retries + 1;
        let mut last_message = String::from("no attempt made");
        let mut last_source = None;

        for attempt in 0..total_attempts {
            debug!("GET {} (attempt {}/{})", url, attempt + 1, total_attempts);

            match self.attempt(&url, params).await {
                Ok(body) => return Ok(body),
                Err(AttemptFailure::Fatal(error)) => return Err(error),
                Err(AttemptFailure::Retryable { message, source }) => {
                    warn!(
                        "Request to {} failed on attempt {}/{}: {}",
                        url,
                        attempt + 1,
                        total_attempts,
                        message
                    );
                    last_message = message;
                    last_source = source;
                }
            }

            if attempt < self.max_retries {
                let delay = self.backoff_delay(attempt);
                info!(
                    "Retrying {} in {:?} (next attempt {})",
                    url,
                    delay,
                    attempt + 2
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(Error::transport(
            format!(
                "Request to {} failed after {} attempts: {}",
                url, total_attempts, last_message
            ),
            last_source,
        ))
    }

    async fn attempt(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<RawResponse, AttemptFailure> {
        let response = match self.client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return Err(AttemptFailure::Fatal(Error::transport(
                    format!("Invalid request for {}", url),
                    Some(e),
                )));
            }
            Err(e) => {
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection error"
                } else {
                    "request error"
                };
                return Err(AttemptFailure::Retryable {
                    message: format!("{}: {}", kind, e),
                    source: Some(e),
                });
            }
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            warn!("Rate limit exceeded for {}, retry after {}s", url, retry_after);
            return Err(AttemptFailure::Fatal(Error::rate_limited(retry_after)));
        }

        if status.is_server_error() {
            return Err(AttemptFailure::Retryable {
                message: format!("HTTP {}", status.as_u16()),
                source: None,
            });
        }

        if !status.is_success() {
            return Err(AttemptFailure::Fatal(Error::client(status.as_u16(), url)));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return Err(AttemptFailure::Retryable {
                    message: format!("failed to read body: {}", e),
                    source: Some(e),
                });
            }
        };

        debug!("Request successful: {} ({} bytes)", status, body.len());

        serde_json::from_slice(&body).map_err(|e| {
            AttemptFailure::Fatal(Error::decode(format!("Invalid JSON from {}: {}", url, e)))
        })
    }
}

/// Seconds to wait according to a Retry-After header
///
/// Only the delta-seconds form is understood; a missing or unparseable
/// header yields the 60-second default.
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
