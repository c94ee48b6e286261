use super::{Reasoner, ReasoningError};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Retries transient failures of the wrapped reasoner with backoff.
///
/// Fatal errors and exhausted retries are returned to the caller, which maps
/// them to a failure of the current stage or turn.
#[derive(Debug)]
pub struct RetryingReasoner<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: Reasoner> RetryingReasoner<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Reasoner> Reasoner for RetryingReasoner<R> {
    fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        retry_with_backoff(
            &self.policy,
            "reasoning call",
            ReasoningError::is_transient,
            |_| self.inner.complete(prompt),
        )
    }
}
