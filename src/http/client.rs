//! Authenticated JSON client for the portal backend.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::ApiError;
use crate::config::ApiClientConfig;
use crate::session::AuthState;

/// Per-call request settings.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Merged over the client's default headers; these win on conflict.
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

/// HTTP client with bounded latency, bearer-token injection and uniform errors.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
    default_headers: HeaderMap,
    auth: Arc<dyn AuthState>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig, auth: Arc<dyn AuthState>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("partner-portal/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Self::with_client(client, config, auth)
    }

    /// Creates a client around an existing reqwest Client.
    pub fn with_client(
        client: Client,
        config: ApiClientConfig,
        auth: Arc<dyn AuthState>,
    ) -> Result<Self> {
        let default_headers = header_map(&config.headers)?;
        Ok(Self {
            client,
            config,
            default_headers,
            auth,
        })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Performs a request against `base_url + endpoint` and decodes the JSON response.
    ///
    /// The whole exchange, body included, must finish within the configured timeout;
    /// otherwise the call is dropped and a 408 error is returned.
    #[tracing::instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let headers = self.build_headers(&options.headers)?;

        debug!("{} {}...", options.method, url);

        let mut builder = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body).map_err(ApiError::network)?);
        }

        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, Self::execute(builder)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} {} timed out after {}ms",
                    options.method,
                    url,
                    timeout.as_millis()
                );
                Err(ApiError::timeout(timeout.as_millis()))
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let endpoint = with_query(endpoint, params);
        self.request(&endpoint, RequestOptions::new(Method::GET))
            .await
    }

    pub async fn post<T, B>(&self, endpoint: &str, data: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::POST, endpoint, data).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, data: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::PUT, endpoint, data).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, data: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::PATCH, endpoint, data).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::new(Method::DELETE))
            .await
    }

    async fn send_with_body<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        data: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = data
            .map(serde_json::to_value)
            .transpose()
            .map_err(ApiError::network)?;
        self.request(endpoint, RequestOptions::new(method).with_body(body))
            .await
    }

    /// Default headers, then the session's bearer token, then per-call overrides.
    fn build_headers(&self, overrides: &HashMap<String, String>) -> Result<HeaderMap, ApiError> {
        let mut headers = self.default_headers.clone();

        // Snapshot: a token rotated after this point does not affect this call
        if let Some(token) = self.auth.session_id() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::network(format!("invalid session token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in overrides {
            let (name, value) = parse_header(name, value).map_err(ApiError::network)?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(ApiError::network)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::network)?;

        if !status.is_success() {
            let error = ApiError::from_response(status, &body);
            debug!("Request failed: {}", error);
            return Err(error);
        }

        // 204 and friends: decode an empty body as JSON null
        let body = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(body).map_err(ApiError::network)
    }
}

/// Appends form-encoded query parameters to an endpoint. No parameters, no `?`.
pub fn with_query(endpoint: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{}?{}", endpoint, query)
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .with_context(|| format!("Invalid header name: {}", name))?;
    let header_value = HeaderValue::from_str(value)
        .with_context(|| format!("Invalid value for header {}", name))?;
    Ok((header_name, header_value))
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let (name, value) = parse_header(name, value)?;
        map.insert(name, value);
    }
    Ok(map)
}
