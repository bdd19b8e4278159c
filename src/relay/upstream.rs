//! Upstream caller.
//!
//! # Responsibilities
//! - Refuse to call out when no API key is configured
//! - POST the payload with bearer auth to the configured endpoint
//! - Bound each attempt with a deadline
//! - Retry 5xx replies and transport failures with linear backoff
//!
//! The caller knows nothing about response shapes: it hands back the
//! status and the raw body text for the classifier.

use std::time::Duration;

use crate::config::RelayConfig;
use crate::http::response::preview;
use crate::observability::metrics;
use crate::relay::error::{AttemptFailure, RelayError};
use crate::relay::payload::UpstreamPayload;
use crate::resilience::{is_retryable_status, with_deadline, RetryPolicy};

/// Raw upstream answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

/// HTTP client bound to the configured chat-completions endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    referer: Option<String>,
    title: Option<String>,
    attempt_timeout: Duration,
    retry: RetryPolicy,
    preview_chars: usize,
}

impl UpstreamClient {
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.upstream.connect_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.upstream.endpoint.clone(),
            api_key: config.upstream.api_key().map(str::to_string),
            referer: config.upstream.referer.clone(),
            title: config.upstream.title.clone(),
            attempt_timeout: Duration::from_millis(config.timeouts.attempt_ms),
            retry: RetryPolicy::new(&config.retries),
            preview_chars: config.responses.html_preview_chars,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send `payload` upstream, retrying within the configured budget.
    ///
    /// Any reply that is not a 5xx is returned as-is, including 4xx.
    pub async fn send(
        &self,
        payload: &UpstreamPayload,
        request_id: &str,
    ) -> Result<UpstreamReply, RelayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RelayError::Misconfigured("upstream API key is not set"))?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let failure = match with_deadline(self.attempt_timeout, self.attempt(api_key, payload)).await {
                Ok(Ok(reply)) if !is_retryable_status(reply.status) => {
                    metrics::record_upstream_attempt("ok");
                    tracing::debug!(
                        request_id = %request_id,
                        attempt,
                        status = reply.status,
                        "Upstream replied"
                    );
                    return Ok(reply);
                }
                Ok(Ok(reply)) => AttemptFailure::Status {
                    status: reply.status,
                    preview: preview(&reply.body, self.preview_chars),
                },
                Ok(Err(e)) => AttemptFailure::Transport {
                    message: e.to_string(),
                },
                Err(elapsed) => AttemptFailure::TimedOut {
                    timeout_ms: elapsed.0.as_millis() as u64,
                },
            };

            metrics::record_upstream_attempt(failure.outcome());
            tracing::warn!(
                request_id = %request_id,
                attempt,
                failure = %failure,
                "Upstream attempt failed"
            );

            if !self.retry.has_budget(attempt) {
                return Err(RelayError::RetriesExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = self.retry.delay(attempt);
            metrics::record_retry();
            tracing::info!(request_id = %request_id, attempt, delay = ?delay, "Retrying upstream call");
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        api_key: &str,
        payload: &UpstreamPayload,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(payload);

        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            request = request.header("X-Title", title);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(UpstreamReply { status, body })
    }
}
