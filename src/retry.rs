//! Bounded retry with exponential backoff for the blocking operations:
//! reasoning calls and repository clones.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How many times to try an operation and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits; used by tests and offline stubs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Whether another attempt is allowed after `attempts_made` failures.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

/// Calculates exponential backoff duration for retry attempts.
///
/// Formula: base_ms * 2^(retry_count-1), capped at max_ms
///
/// # Examples
///
/// With base_ms=1000, max_ms=5000:
/// - Retry 1: 1s
/// - Retry 2: 2s
/// - Retry 3: 4s
/// - Retry 4+: 5s (capped)
pub fn calculate_backoff(retry_count: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry_count == 0 {
        return Duration::from_millis(0);
    }

    let exponent = retry_count - 1;
    let multiplier = 2u64.saturating_pow(exponent);
    let backoff_ms = base_ms.saturating_mul(multiplier).min(max_ms);

    Duration::from_millis(backoff_ms)
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts. The last error is returned.
pub fn retry_with_backoff<T, E, F, P>(
    policy: &RetryPolicy,
    what: &str,
    is_transient: P,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && policy.should_retry(attempt) => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "{what} failed, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0, 1000, 5000), Duration::from_millis(0));
        assert_eq!(calculate_backoff(1, 1000, 5000), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(2, 1000, 5000), Duration::from_millis(2000));
        assert_eq!(calculate_backoff(3, 1000, 5000), Duration::from_millis(4000));
        assert_eq!(calculate_backoff(4, 1000, 5000), Duration::from_millis(5000)); // capped
        assert_eq!(calculate_backoff(40, 1000, 5000), Duration::from_millis(5000));
    }

    #[test]
    fn test_retries_transient_until_success() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let result: Result<&str, String> = retry_with_backoff(
            &policy,
            "op",
            |_| true,
            |attempt| {
                calls += 1;
                if attempt < 3 {
                    Err(format!("flaky {attempt}"))
                } else {
                    Ok("done")
                }
            },
        );
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::immediate(2);
        let mut calls = 0;
        let result: Result<(), String> = retry_with_backoff(
            &policy,
            "op",
            |_| true,
            |_| {
                calls += 1;
                Err("down".to_string())
            },
        );
        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let result: Result<(), String> = retry_with_backoff(
            &policy,
            "op",
            |e: &String| e.starts_with("transient"),
            |_| {
                calls += 1;
                Err("fatal: bad key".to_string())
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
