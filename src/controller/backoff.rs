//! # Retry Backoff
//!
//! Fibonacci backoff for failed reconciles, tracked per credential secret so
//! one failing secret does not delay retries of another.

use crate::constants::{DEFAULT_RETRY_MAX_SECS, DEFAULT_RETRY_MIN_SECS};
use crate::store::ObjectKey;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci sequence of delays, scaled by `min_secs` and capped at `max_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
}

impl FibonacciBackoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
        }
    }

    /// Delay before retry number `attempt` (1-based): min, min, 2·min, 3·min, 5·min, ...
    pub fn delay_secs(&self, attempt: u32) -> u64 {
        let (mut previous, mut current) = (0u64, 1u64);
        for _ in 1..attempt {
            let next = previous.saturating_add(current);
            previous = current;
            current = next;
            if current.saturating_mul(self.min_secs) >= self.max_secs {
                break;
            }
        }
        current.saturating_mul(self.min_secs).min(self.max_secs)
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_MIN_SECS, DEFAULT_RETRY_MAX_SECS)
    }
}

/// Consecutive failure counts per secret
#[derive(Debug, Default)]
pub struct RetryTracker {
    backoff: FibonacciBackoff,
    attempts: Mutex<HashMap<ObjectKey, u32>>,
}

impl RetryTracker {
    pub fn new(backoff: FibonacciBackoff) -> Self {
        Self {
            backoff,
            attempts: Mutex::default(),
        }
    }

    /// Count a failure for `key` and return how long to wait before retrying
    pub fn record_failure(&self, key: &ObjectKey) -> (Duration, u32) {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let count = attempts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        (Duration::from_secs(self.backoff.delay_secs(*count)), *count)
    }

    /// Forget the failures of `key` after a successful reconcile
    pub fn reset(&self, key: &ObjectKey) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
