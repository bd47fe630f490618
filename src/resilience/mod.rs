//! Retry and rate-limit wait policy for the request engine.
//!
//! The policy only decides; the engine performs the sleeps. Keeping the
//! two apart lets the decision table be tested without a server or clock.

use crate::config::{RateLimitConfig, RetryConfig};
use crate::errors::GitHubError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

/// Suspends the engine between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Progress of one logical request through the retry loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    /// Network/5xx failures seen so far; doubles as the backoff exponent.
    pub attempt: u32,
    /// Rate-limit short waits taken so far.
    pub short_waits: u32,
}

/// What the engine should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep until the rate limit resets, then retry without spending budget.
    WaitForReset(Duration),
    /// Sleep for the backoff delay, then retry.
    Backoff(Duration),
    /// Surface the error.
    GiveUp,
}

/// Retry policy combining exponential backoff with short rate-limit waits.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    retry: RetryConfig,
    rate_limit: RateLimitConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(retry: RetryConfig, rate_limit: RateLimitConfig) -> Self {
        Self { retry, rate_limit }
    }

    /// Gets the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Backoff before retry number `attempt + 1`: `min(max, base * 2^attempt)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.retry
            .backoff_base
            .checked_mul(factor)
            .map_or(self.retry.max_backoff, |d| d.min(self.retry.max_backoff))
    }

    /// Decides how to continue after `error`, given the Unix time `now`.
    pub fn decide(&self, error: &GitHubError, state: AttemptState, now: i64) -> RetryDecision {
        if error.is_rate_limit() {
            return self.decide_rate_limit(error.reset_epoch(), state, now);
        }

        if error.is_retryable() && state.attempt < self.retry.max_retries {
            return RetryDecision::Backoff(self.backoff_delay(state.attempt));
        }

        RetryDecision::GiveUp
    }

    fn decide_rate_limit(&self, reset_epoch: Option<i64>, state: AttemptState, now: i64) -> RetryDecision {
        let Some(reset) = reset_epoch else {
            return RetryDecision::GiveUp;
        };
        if let Some(cap) = self.rate_limit.max_short_waits {
            if state.short_waits >= cap {
                return RetryDecision::GiveUp;
            }
        }

        let wait = Duration::from_secs(u64::try_from(reset - now).unwrap_or(0));
        if wait <= self.rate_limit.short_wait_threshold {
            RetryDecision::WaitForReset(wait + self.rate_limit.wait_padding)
        } else {
            RetryDecision::GiveUp
        }
    }
}
