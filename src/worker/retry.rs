use std::time::Duration;

use thiserror::Error;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

use crate::ai::client::is_safety_finish_reason;
use crate::ai::{Generation, SummaryModel};
use crate::errors::DigestError;

/// Bounded retry with exponential backoff for one generation request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Backoff before retry `n` is `2^n` units, jittered.
    pub backoff_unit: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delays between attempts; one fewer than `max_attempts`.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        let unit = u64::try_from(self.backoff_unit.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(unit)
            .max_delay(self.max_backoff)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Why a topic, chunk or combining request produced no summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryFailure {
    #[error("prompt_blocked: {0}")]
    PromptBlocked(String),

    #[error("finish_reason={0}")]
    FinishReason(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("max retries exceeded (last error: {0})")]
    MaxRetriesExceeded(String),
}

impl SummaryFailure {
    /// The model refused the content itself; resubmitting it unchanged will not help.
    #[must_use]
    pub fn is_content_block(&self) -> bool {
        match self {
            SummaryFailure::PromptBlocked(_) => true,
            SummaryFailure::FinishReason(reason) => is_safety_finish_reason(reason),
            SummaryFailure::EmptyResponse | SummaryFailure::MaxRetriesExceeded(_) => false,
        }
    }

    /// Whether a smaller input might succeed where this one failed.
    #[must_use]
    pub fn is_fallback_eligible(&self) -> bool {
        self.is_content_block() || matches!(self, SummaryFailure::MaxRetriesExceeded(_))
    }
}

enum AttemptError {
    Transient(DigestError),
    Final(SummaryFailure),
}

/// Run one generation request under `policy`.
///
/// Request errors are retried with backoff. Blocks and empty responses end
/// the attempt immediately.
///
/// # Errors
///
/// Returns the failure of the last attempt, or `MaxRetriesExceeded` when every
/// attempt hit a request error.
pub async fn generate_with_retry<M>(
    model: &M,
    policy: &RetryPolicy,
    key_slot: usize,
    prompt: &str,
) -> Result<String, SummaryFailure>
where
    M: SummaryModel + ?Sized,
{
    let mut attempt = 0usize;
    let result = RetryIf::spawn(
        policy.strategy(),
        || {
            attempt += 1;
            let current = attempt;
            async move {
                match model.generate(key_slot, prompt).await {
                    Ok(Generation::Text(text)) if !text.trim().is_empty() => Ok(text),
                    Ok(Generation::Text(_)) | Ok(Generation::Empty { finish_reason: None }) => {
                        Err(AttemptError::Final(SummaryFailure::EmptyResponse))
                    }
                    Ok(Generation::Empty {
                        finish_reason: Some(reason),
                    }) => Err(AttemptError::Final(SummaryFailure::FinishReason(reason))),
                    Ok(Generation::PromptBlocked(reason)) => {
                        Err(AttemptError::Final(SummaryFailure::PromptBlocked(reason)))
                    }
                    Err(e) => {
                        warn!("Summary attempt {} failed: {}", current, e);
                        Err(AttemptError::Transient(e))
                    }
                }
            }
        },
        |e: &AttemptError| matches!(e, AttemptError::Transient(_)),
    )
    .await;

    result.map_err(|e| match e {
        AttemptError::Transient(last) => SummaryFailure::MaxRetriesExceeded(last.to_string()),
        AttemptError::Final(failure) => failure,
    })
}
