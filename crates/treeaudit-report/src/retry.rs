use crate::ai::{AiProvider, CollaboratorError, CompletionRequest, CompletionResponse};
use std::time::Duration;

/// A transient failure gets exactly one re-send.
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    pub fn from_millis(backoff_ms: u64) -> Self {
        Self::new(Duration::from_millis(backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(2000)
    }
}

pub fn complete_with_retry(
    provider: &dyn AiProvider,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<CompletionResponse, CollaboratorError> {
    let mut attempt = 1;
    loop {
        match provider.complete(request) {
            Ok(response) => return Ok(response),
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(
                    attempt,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    "transient ai failure, retrying: {err}"
                );
                std::thread::sleep(policy.backoff);
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(attempt, "ai request failed: {err}");
                return Err(err);
            }
        }
    }
}
