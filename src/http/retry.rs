//! Retry, backoff and freshness policy for queries and mutations.

use std::time::Duration;

use super::error::ApiError;

/// Maximum number of retries for a failed query.
pub const QUERY_MAX_RETRIES: u32 = 3;

/// Maximum number of retries for a failed mutation.
pub const MUTATION_MAX_RETRIES: u32 = 1;

/// Delay before the first retry in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for any retry delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Decides whether and when a failed operation is attempted again.
///
/// `failure_count` is the number of failures that happened before the current one,
/// so it is `0` when the first attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub query_max_retries: u32,
    pub mutation_max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            query_max_retries: QUERY_MAX_RETRIES,
            mutation_max_retries: MUTATION_MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry_query(&self, failure_count: u32, error: &ApiError) -> bool {
        // Authentication failures never recover by themselves
        if matches!(error.status(), 401 | 403) {
            return false;
        }

        if error.is_client_error() {
            return false;
        }

        failure_count < self.query_max_retries
    }

    pub fn should_retry_mutation(&self, failure_count: u32, error: &ApiError) -> bool {
        if error.is_client_error() {
            return false;
        }

        failure_count < self.mutation_max_retries
    }

    /// Exponential backoff: `base * 2^attempt`, capped at `max_delay`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Freshness and refetch behavior of cached query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a fetched result is served without refetching.
    pub stale_time: Duration,
    /// How long an unused entry stays in the cache.
    pub gc_time: Duration,
    pub refetch_on_window_focus: bool,
    pub refetch_on_reconnect: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            refetch_on_window_focus: false,
            refetch_on_reconnect: true,
        }
    }
}
