//! Call executor: one logical request with bounded exponential-backoff retry.
//!
//! Independent of caching. Each `call` owns its retry budget.

use crate::errors::LlmError;
use crate::model::RequestPayload;
use crate::providers::llm::CompletionTransport;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Wait after the `failed_attempt`-th failure (1-based): `base * 2^(n-1)`, capped.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Every wait a fully failing call goes through, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1)).map(|n| self.backoff(n)).collect()
    }
}

pub struct CallExecutor {
    transport: Arc<dyn CompletionTransport>,
    policy: RetryPolicy,
}

impl CallExecutor {
    pub fn new(transport: Arc<dyn CompletionTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn provider_name(&self) -> &'static str {
        self.transport.provider_name()
    }

    /// Send `payload`, retrying transient failures. The last error propagates
    /// once attempts are exhausted; non-transient errors propagate immediately.
    pub async fn call(&self, payload: &RequestPayload) -> Result<Value, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.transport.send(payload).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    warn!(
                        error = %e,
                        provider = self.transport.provider_name(),
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying request"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(error = %e, attempts = attempt, "retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
