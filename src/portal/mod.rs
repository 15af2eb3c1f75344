//! Typed endpoints of the partner portal backend.
//!
//! Reads go through the [`QueryClient`] under the factory keys in
//! [`crate::query::keys`]; writes run as mutations and invalidate what they touch.

mod models;

use log::{debug, info, warn};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::http::{ApiClient, ApiError, with_query};
use crate::query::{QueryClient, keys};

pub use models::{
    ApiKey, ApiKeyEnvironment, ApiKeyStatus, CreateApiKey, LoginData, LoginResponse, Partner,
    PartnerStatus, PartnerTier, SessionUser, UserRole,
};

pub struct PortalApi {
    client: ApiClient,
    queries: Arc<QueryClient>,
}

impl PortalApi {
    pub fn new(client: ApiClient, queries: Arc<QueryClient>) -> Self {
        Self { client, queries }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Credential sign-in. Any failure, including a rejected password, yields `None`.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Option<SessionUser> {
        if email.is_empty() || password.is_empty() {
            return None;
        }

        let credentials = json!({ "email": email, "password": password });
        match self
            .client
            .post::<LoginResponse, _>("/auth/login", Some(&credentials))
            .await
        {
            Ok(LoginResponse {
                success: true,
                data: Some(LoginData { user: Some(user) }),
            }) => {
                info!("Signed in as {}", user.email);
                Some(user)
            }
            Ok(_) => {
                debug!("Login for {} was not accepted", email);
                None
            }
            Err(e) => {
                warn!("Authentication error: {}", e);
                None
            }
        }
    }

    pub async fn partner(&self, partner_id: &str) -> Result<Partner, ApiError> {
        let path = format!("/partners/{}", partner_id);
        self.queries
            .fetch_query(&keys::partner(partner_id), || self.client.get(&path, &[]))
            .await
    }

    pub async fn partner_analytics(&self, partner_id: &str) -> Result<Value, ApiError> {
        let path = format!("/partners/{}/analytics", partner_id);
        self.queries
            .fetch_query(&keys::partner_analytics(partner_id), || {
                self.client.get(&path, &[])
            })
            .await
    }

    pub async fn api_keys(&self, partner_id: &str) -> Result<Vec<ApiKey>, ApiError> {
        let path = format!("/partners/{}/api-keys", partner_id);
        self.queries
            .fetch_query(&keys::api_keys(partner_id), || self.client.get(&path, &[]))
            .await
    }

    pub async fn analytics_usage(&self, partner_id: &str, period: &str) -> Result<Value, ApiError> {
        let path = with_query(
            &format!("/analytics/usage/{}", partner_id),
            &[("period", period)],
        );
        self.queries
            .fetch_query(&keys::analytics_usage(partner_id, period), || {
                self.client.get(&path, &[])
            })
            .await
    }

    pub async fn tickets(&self, partner_id: &str) -> Result<Vec<Value>, ApiError> {
        let path = with_query("/support/tickets", &[("partnerId", partner_id)]);
        self.queries
            .fetch_query(&keys::tickets(partner_id), || self.client.get(&path, &[]))
            .await
    }

    pub async fn health_status(&self) -> Result<Value, ApiError> {
        self.queries
            .fetch_query(&keys::health_status(), || {
                self.client.get("/health/status", &[])
            })
            .await
    }

    pub async fn billing_info(&self, partner_id: &str) -> Result<Value, ApiError> {
        let path = format!("/billing/{}", partner_id);
        self.queries
            .fetch_query(&keys::billing_info(partner_id), || {
                self.client.get(&path, &[])
            })
            .await
    }

    pub async fn create_api_key(
        &self,
        partner_id: &str,
        request: &CreateApiKey,
    ) -> Result<ApiKey, ApiError> {
        let path = format!("/partners/{}/api-keys", partner_id);
        let key: ApiKey = self
            .queries
            .mutate(|| self.client.post(&path, Some(request)))
            .await?;

        self.queries.invalidate_queries(&keys::api_keys(partner_id));
        Ok(key)
    }

    pub async fn revoke_api_key(&self, partner_id: &str, key_id: &str) -> Result<(), ApiError> {
        let path = format!("/partners/{}/api-keys/{}", partner_id, key_id);
        self.queries
            .mutate(|| self.client.delete::<Option<Value>>(&path))
            .await?;

        self.queries.invalidate_queries(&keys::api_keys(partner_id));
        Ok(())
    }
}
