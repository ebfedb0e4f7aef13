//! Retry decisions and jittered backoff for recoverable API failures.
//!
//! The backoff is deliberately gentle: the delay before the retry that
//! follows attempt `n` (zero-based) is
//!
//! ```text
//! delay = max(min_delay, uniform(0, n) * unit)
//! ```
//!
//! so the first retry happens after just the session's minimum delay and
//! later retries spread out without growing exponentially.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use archiver_core::api::{BackoffPolicy, FailureType, RetryDecision};
//!
//! let policy = BackoffPolicy::with_seed(3, Duration::from_millis(200), Duration::from_secs(1), 7);
//! match policy.should_retry(FailureType::Recoverable, 0) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 1);
//!         assert!(delay >= Duration::from_millis(200));
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::classify::FailureType;
use super::constants::{DEFAULT_JITTER_UNIT, DEFAULT_MAX_RETRIES};

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after sleeping for `delay`.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Zero-based index of the attempt about to be made.
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Computes the sleep before the retry that follows the zero-based `attempt`.
///
/// Pure apart from the supplied random source.
pub fn backoff_delay<R: Rng + ?Sized>(
    attempt: u32,
    min_delay: Duration,
    unit: Duration,
    rng: &mut R,
) -> Duration {
    let jitter = if attempt == 0 {
        Duration::ZERO
    } else {
        unit.mul_f64(rng.gen_range(0.0..f64::from(attempt)))
    };
    jitter.max(min_delay)
}

/// Attempt cap plus jittered backoff, with an injectable random source.
#[derive(Debug)]
pub struct BackoffPolicy {
    max_attempts: u32,
    min_delay: Duration,
    unit: Duration,
    rng: Mutex<StdRng>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, Duration::ZERO, DEFAULT_JITTER_UNIT)
    }
}

impl BackoffPolicy {
    /// Creates a policy seeded from OS entropy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, min_delay: Duration, unit: Duration) -> Self {
        Self::with_rng(max_attempts, min_delay, unit, StdRng::from_entropy())
    }

    /// Creates a policy with a deterministic random source.
    #[must_use]
    pub fn with_seed(max_attempts: u32, min_delay: Duration, unit: Duration, seed: u64) -> Self {
        Self::with_rng(max_attempts, min_delay, unit, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_attempts: u32, min_delay: Duration, unit: Duration, rng: StdRng) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay,
            unit,
            rng: Mutex::new(rng),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Draws the next backoff delay for the zero-based `attempt`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        backoff_delay(attempt, self.min_delay, self.unit, &mut *rng)
    }

    /// Decides whether to retry after the zero-based `attempt` failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Unrecoverable {
            return RetryDecision::DoNotRetry {
                reason: "unrecoverable failure - retry would not help".to_string(),
            };
        }

        if attempt + 1 >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.next_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}
