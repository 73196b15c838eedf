//! Explicit retry policy for external calls.
//!
//! The embedding and generation clients classify each failed attempt as
//! transient or fatal; [`RetryPolicy::run`] retries transient failures
//! with exponential backoff and surfaces the last error once attempts are
//! exhausted. Fatal failures propagate immediately.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Classification of a single failed attempt at an external call.
pub enum CallError {
    /// Worth retrying: rate limit, server error, network failure.
    Transient(anyhow::Error),
    /// Retrying cannot help: client error, bad request, bad configuration.
    Fatal(anyhow::Error),
}

/// Max attempts plus backoff schedule, applied generically to any
/// external call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after
    /// (1s, 2s, 4s, ... capped at 2^5 × base).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run `op`, retrying transient failures per the policy.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut last_err = None;

        for attempt in 0..self.max_attempts.max(1) {
            if attempt > 0 {
                let delay = self.base_delay * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Transient(e)) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Call failed after retries")))
    }
}
