//! Service factory for building command dependencies.
//!
//! Construction of the API client, session, error registry and query cache is kept
//! apart from the commands that use them, so each command gets a fresh set.

use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::config::ApiClientConfig;
use crate::errors::ErrorRegistry;
use crate::http::{ApiClient, CacheOptions, RetryPolicy};
use crate::portal::PortalApi;
use crate::query::QueryClient;
use crate::session::SessionStore;

pub struct Services {
    pub session: Arc<SessionStore>,
    pub registry: Arc<ErrorRegistry>,
    pub client: ApiClient,
    pub queries: Arc<QueryClient>,
}

impl Services {
    pub fn portal(&self) -> PortalApi {
        PortalApi::new(self.client.clone(), self.queries.clone())
    }
}

/// Build the session holder, with the token if one was given
pub fn build_session(token: Option<&str>) -> Arc<SessionStore> {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => {
            debug!(
                "Using session token: {}****",
                token.chars().take(4).collect::<String>()
            );
            Arc::new(SessionStore::with_token(token))
        }
        None => Arc::new(SessionStore::new()),
    }
}

/// Build every service from configuration
pub fn build_services(
    config: ApiClientConfig,
    token: Option<&str>,
    policy: RetryPolicy,
) -> Result<Services> {
    let session = build_session(token);
    let registry = Arc::new(ErrorRegistry::new());
    let client = ApiClient::new(config, session.clone())?;
    let queries = Arc::new(QueryClient::with_options(
        policy,
        CacheOptions::default(),
        session.clone(),
        registry.clone(),
    ));

    Ok(Services {
        session,
        registry,
        client,
        queries,
    })
}
