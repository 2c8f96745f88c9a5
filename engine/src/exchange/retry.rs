//! Timeout and bounded retry for exchange calls

use crate::error::EngineError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Per-call timeout plus a bounded number of retries with linear backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            retries: 1,
            backoff_ms: 250,
        }
    }
}

/// Run `call` under the policy's timeout, retrying transient failures.
///
/// Non-transient errors are returned immediately. After the last attempt the
/// transient error is returned to the caller, who skips the action for this
/// cycle.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout(), call()).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::transient(
                operation,
                format!("timed out after {}ms", policy.timeout_ms),
            )),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.retries => {
                attempt += 1;
                warn!(operation, attempt, error = %err, "Exchange call failed, retrying");
                tokio::time::sleep(policy.backoff() * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
