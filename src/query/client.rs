//! Query cache and executor.
//!
//! Runs queries and mutations under the [`RetryPolicy`], keeps fetched results
//! fresh for [`CacheOptions::stale_time`], evicts idle entries after
//! [`CacheOptions::gc_time`], and routes final failures to the session and the
//! error registry.

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use super::keys::QueryKey;
use super::network::NetworkStatus;
use crate::errors::{ErrorRecord, ErrorSink};
use crate::http::{ApiError, CacheOptions, RetryPolicy};
use crate::session::AuthState;

pub const QUERY_ERROR_CODE: &str = "QUERY_ERROR";
pub const MUTATION_ERROR_CODE: &str = "MUTATION_ERROR";

const QUERY_ERROR_MESSAGE: &str = "Failed to fetch data";
const MUTATION_ERROR_MESSAGE: &str = "An error occurred during the operation";

struct CacheEntry {
    data: Value,
    updated_at: Instant,
    last_used: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(data: Value) -> Self {
        let now = Instant::now();
        Self {
            data,
            updated_at: now,
            last_used: now,
            invalidated: false,
        }
    }

    fn is_fresh(&self, stale_time: std::time::Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

pub struct QueryClient {
    policy: RetryPolicy,
    options: CacheOptions,
    cache: Mutex<HashMap<QueryKey, CacheEntry>>,
    network: NetworkStatus,
    auth: Arc<dyn AuthState>,
    errors: Arc<dyn ErrorSink>,
}

impl QueryClient {
    pub fn new(auth: Arc<dyn AuthState>, errors: Arc<dyn ErrorSink>) -> Self {
        Self::with_options(RetryPolicy::default(), CacheOptions::default(), auth, errors)
    }

    pub fn with_options(
        policy: RetryPolicy,
        options: CacheOptions,
        auth: Arc<dyn AuthState>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            policy,
            options,
            cache: Mutex::new(HashMap::new()),
            network: NetworkStatus::default(),
            auth,
            errors,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Returns the cached result for `key` while it is fresh, otherwise fetches it.
    ///
    /// Failed fetches are retried per the query policy; the final error goes through
    /// the query failure hook before being returned.
    #[tracing::instrument(skip(self, key, fetcher), fields(key = %key))]
    pub async fn fetch_query<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.collect_garbage();

        if let Some(data) = self.fresh_data(key) {
            match serde_json::from_value(data) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    return Ok(value);
                }
                Err(e) => debug!("Cached value for {} does not decode ({}), refetching", key, e),
            }
        }

        let policy = &self.policy;
        let result = self
            .run_with_retry("query", false, fetcher, |count, error| {
                policy.should_retry_query(count, error)
            })
            .await;

        match result {
            Ok(value) => {
                match serde_json::to_value(&value) {
                    Ok(data) => self.store(key, data),
                    Err(e) => warn!("Not caching result for {}: {}", key, e),
                }
                Ok(value)
            }
            Err(error) => {
                self.on_query_error(&error);
                Err(error)
            }
        }
    }

    /// Runs a mutation. While offline the mutation is held, not failed, and starts
    /// once the network is back.
    #[tracing::instrument(skip(self, mutation))]
    pub async fn mutate<T, F, Fut>(&self, mutation: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let policy = &self.policy;
        let result = self
            .run_with_retry("mutation", true, mutation, |count, error| {
                policy.should_retry_mutation(count, error)
            })
            .await;

        if let Err(error) = &result {
            self.on_mutation_error(error);
        }
        result
    }

    async fn run_with_retry<T, F, Fut, P>(
        &self,
        operation_name: &str,
        wait_for_network: bool,
        operation: F,
        should_retry: P,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
        P: Fn(u32, &ApiError) -> bool,
    {
        let mut failure_count = 0;

        loop {
            if wait_for_network && !self.network.is_online() {
                debug!("{}: offline, waiting for the network...", operation_name);
                self.network.wait_until_online().await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !should_retry(failure_count, &error) {
                        debug!(
                            "{}: giving up after {} attempt(s): {}",
                            operation_name,
                            failure_count + 1,
                            error
                        );
                        return Err(error);
                    }

                    let delay = self.policy.retry_delay(failure_count);
                    warn!(
                        "{}: attempt {} failed ({}), retrying in {}ms...",
                        operation_name,
                        failure_count + 1,
                        error,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    failure_count += 1;
                }
            }
        }
    }

    fn on_query_error(&self, error: &ApiError) {
        if error.is_unauthorized() {
            self.auth.logout();
            return;
        }

        self.errors
            .add_error(error_record(error, QUERY_ERROR_CODE, QUERY_ERROR_MESSAGE));
    }

    fn on_mutation_error(&self, error: &ApiError) {
        if error.is_unauthorized() {
            self.auth.logout();
            return;
        }

        self.errors.add_error(error_record(
            error,
            MUTATION_ERROR_CODE,
            MUTATION_ERROR_MESSAGE,
        ));
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    /// Number of mutations waiting for the network.
    pub fn paused_mutations(&self) -> usize {
        self.network.paused()
    }

    /// Applies a network transition.
    ///
    /// Online after offline: paused mutations resume and every cached query is
    /// invalidated. Offline: new and retrying mutations wait.
    pub fn set_online(&self, online: bool) {
        let was_online = self.network.set_online(online);

        match (was_online, online) {
            (false, true) => {
                info!(
                    "Network is back, resuming {} paused mutation(s)",
                    self.network.paused()
                );
                if self.options.refetch_on_reconnect {
                    self.invalidate_all();
                }
            }
            (true, false) => info!("Network lost, pausing mutations"),
            _ => {}
        }
    }

    /// Cached value for `key` regardless of freshness.
    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let mut cache = self.cache.lock().unwrap();
        let entry = cache.get_mut(key)?;
        entry.last_used = Instant::now();
        serde_json::from_value(entry.data.clone()).ok()
    }

    pub fn set_query_data<T: Serialize>(&self, key: &QueryKey, value: &T) -> serde_json::Result<()> {
        let data = serde_json::to_value(value)?;
        self.store(key, data);
        Ok(())
    }

    /// Whether the next `fetch_query` for `key` will hit the network.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let cache = self.cache.lock().unwrap();
        cache
            .get(key)
            .is_none_or(|entry| !entry.is_fresh(self.options.stale_time))
    }

    /// Marks every entry under `prefix` as stale. Returns how many were marked.
    pub fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let mut cache = self.cache.lock().unwrap();
        let mut count = 0;
        for (key, entry) in cache.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!("Invalidated {} queries under {}", count, prefix);
        count
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate_queries(&QueryKey::new(Vec::<String>::new()))
    }

    /// Drops every entry under `prefix`. Returns how many were dropped.
    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut cache = self.cache.lock().unwrap();
        let before = cache.len();
        cache.retain(|key, _| !key.starts_with(prefix));
        before - cache.len()
    }

    /// Evicts entries that have not been used for `gc_time`. Returns how many were evicted.
    pub fn collect_garbage(&self) -> usize {
        let gc_time = self.options.gc_time;
        let mut cache = self.cache.lock().unwrap();
        let before = cache.len();
        cache.retain(|_, entry| entry.last_used.elapsed() < gc_time);
        let evicted = before - cache.len();
        if evicted > 0 {
            debug!("Evicted {} idle cache entries", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_data(&self, key: &QueryKey) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap();
        let entry = cache.get_mut(key)?;
        entry.last_used = Instant::now();
        entry
            .is_fresh(self.options.stale_time)
            .then(|| entry.data.clone())
    }

    fn store(&self, key: &QueryKey, data: Value) {
        self.cache
            .lock()
            .unwrap()
            .insert(key.clone(), CacheEntry::new(data));
    }
}

fn error_record(error: &ApiError, default_code: &str, default_message: &str) -> ErrorRecord {
    let message = if error.message().is_empty() {
        default_message
    } else {
        error.message()
    };

    ErrorRecord {
        code: error.code().unwrap_or(default_code).to_string(),
        message: message.to_string(),
        details: error.to_details(),
    }
}
