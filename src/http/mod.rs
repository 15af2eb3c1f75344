//! HTTP client module with timeout, auth injection and the retry policy.

mod client;
mod error;
mod retry;

pub use client::{ApiClient, RequestOptions, with_query};
pub use error::{ApiError, ErrorKind, NETWORK_ERROR_STATUS, TIMEOUT_STATUS};
pub use retry::{
    CacheOptions, MUTATION_MAX_RETRIES, QUERY_MAX_RETRIES, RETRY_BASE_DELAY_MS,
    RETRY_MAX_DELAY_MS, RetryPolicy,
};
