use super::chain::{RequestContext, ResponseMiddleware, Verdict};
use super::response::FetchResponse;
use crate::{ScraperError, ScraperResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Where a wait came from: the server's own hint, or our computed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSource {
    Header,
    Computed,
}

/// Per-response retry advice. Not persisted anywhere.
#[derive(Debug, Clone, Copy)]
pub struct RetryDecision {
    pub wait: Duration,
    pub source: WaitSource,
}

/// Routes spider behavior by HTTP status code. Rate-limit responses
/// (429/503) produce a wait: the server's `Retry-After` hint when usable,
/// exponential backoff otherwise. Waits above the configured maximum abort
/// the request chain instead of sleeping.
pub struct StatusCodeMiddleware {
    wait_base: Duration,
    wait_max: Duration,
}

impl StatusCodeMiddleware {
    pub fn new(wait_base: Duration, wait_max: Duration) -> Self {
        Self {
            wait_base,
            wait_max,
        }
    }

    /// Computed backoff: `base * 2^retry_count`. Saturates to the maximum
    /// representable duration on overflow, which the caller then rejects as
    /// a retry timeout.
    pub fn exponential_backoff(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.wait_base.checked_mul(factor).unwrap_or(Duration::MAX)
    }

    /// Determines the length of time to wait before retrying. A usable
    /// `Retry-After` header takes precedence over computed backoff; a
    /// malformed one is logged and falls back to backoff.
    pub fn wait_decision(
        &self,
        response: &FetchResponse,
        request: &RequestContext,
    ) -> RetryDecision {
        self.wait_decision_at(response, request, Utc::now())
    }

    pub(crate) fn wait_decision_at(
        &self,
        response: &FetchResponse,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        if let Some(raw) = response.header("Retry-After").map(str::trim) {
            match read_retry_after(raw, now) {
                Ok(seconds) => {
                    return RetryDecision {
                        wait: Duration::from_secs(seconds),
                        source: WaitSource::Header,
                    };
                }
                Err(e) => error!("{e}"),
            }
        }
        RetryDecision {
            wait: self.exponential_backoff(request.retry_count()),
            source: WaitSource::Computed,
        }
    }
}

#[async_trait]
impl ResponseMiddleware for StatusCodeMiddleware {
    async fn handle_response(
        &self,
        response: &FetchResponse,
        request: &mut RequestContext,
    ) -> ScraperResult<Verdict> {
        match response.status {
            200 => return Ok(Verdict::Proceed),
            400 | 401 | 403 | 404 => {
                error!("Status code: {} from '{}'", response.status, response.url);
                return Ok(Verdict::Proceed);
            }
            429 | 503 => {
                error!("Status code: {} from '{}'", response.status, response.url);
            }
            _ => {
                warn!(
                    "Unhandled status code: {} from '{}'",
                    response.status, response.url
                );
                return Ok(Verdict::Proceed);
            }
        }

        let decision = self.wait_decision(response, request);
        if decision.wait > self.wait_max {
            error!(
                "Wait time of {:?} for '{}' is too long",
                decision.wait, response.url
            );
            return Err(ScraperError::RetryTimeout(decision.wait));
        }

        warn!(
            "Waiting {:?} before retrying '{}' ({:?})",
            decision.wait, response.url, decision.source
        );
        sleep(decision.wait).await;
        request.increase_retry_count();
        Ok(Verdict::Retry)
    }
}

/// `Retry-After` carries either a number of seconds or an HTTP-date. Both
/// forms reduce to whole seconds from `now`, clamped to zero for dates
/// already in the past.
pub(crate) fn read_retry_after(raw: &str, now: DateTime<Utc>) -> ScraperResult<u64> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<u64>()
            .map_err(|_| ScraperError::MalformedRetryAfter(raw.to_string()));
    }

    let date = DateTime::parse_from_rfc2822(raw)
        .map_err(|_| ScraperError::MalformedRetryAfter(raw.to_string()))?;
    let delay_ms = date
        .with_timezone(&Utc)
        .signed_duration_since(now)
        .num_milliseconds();
    if delay_ms <= 0 {
        return Ok(0);
    }
    // Ceil to whole seconds so we never retry early.
    Ok(((delay_ms + 999) / 1000) as u64)
}
