use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::PlannerConfig;
use crate::error::ProtocolError;

/// Exponential backoff shared by planner and reviewer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    pub fn from_config(cfg: &PlannerConfig) -> Self {
        Self::new(cfg.max_retries, cfg.base_delay_ms, cfg.max_delay_ms)
    }

    /// Delay before retry number `attempt` (0-based), or `None` once the budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let exp = 1u64 << attempt.min(30);
        let delay = self.base_delay_ms.saturating_mul(exp);
        let delay = delay.min(self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

/// Run `op` until it succeeds or the retry budget is spent.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    capability: &str,
    mut op: F,
) -> Result<T, ProtocolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.next_delay(attempt) {
                Some(delay) => {
                    warn!(capability, attempt, error = %format!("{e:#}"), "call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(ProtocolError::RetriesExhausted {
                        capability: capability.to_string(),
                        attempts: attempt + 1,
                        last_error: format!("{e:#}"),
                    })
                }
            },
        }
    }
}
