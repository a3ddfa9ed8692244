//! Retry logic with exponential backoff for transient errors.
//!
//! Only reads go through here. A mutating request that timed out may still
//! have been applied, so those are never repeated.

use crate::error::Result;
use crate::types::RetryConfig;
use std::thread;

/// Execute an operation, retrying retryable errors with backoff.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once all attempts are used.
pub fn with_retry<T, F>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                log::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:.1}s...",
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_secs_f64()
                );
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
