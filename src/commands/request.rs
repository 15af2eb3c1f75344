//! Raw request commands: GET runs as a cached query, writes run as mutations.

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Method;
use serde_json::Value;

use super::services::Services;
use crate::errors::ErrorRecord;
use crate::http::{RequestOptions, with_query};
use crate::query::QueryKey;

/// Parses `key=value` command line pairs.
pub fn parse_param(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid parameter '{}'. Expected KEY=VALUE.", s),
    }
}

/// Parses `Name: value` command line headers.
pub fn parse_header_arg(s: &str) -> Result<(String, String)> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("Invalid header '{}'. Expected 'Name: value'.", s),
    }
}

/// GET `endpoint` through the query cache.
#[tracing::instrument(skip(services, params))]
pub async fn run_query(
    services: &Services,
    endpoint: &str,
    params: &[(String, String)],
) -> Result<Value> {
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let endpoint = with_query(endpoint, &pairs);
    let key = QueryKey::new(["request", endpoint.as_str()]);

    debug!("Running query {}", key);
    let client = &services.client;
    let value = services
        .queries
        .fetch_query(&key, || client.get(&endpoint, &[]))
        .await
        .map_err(|e| report(services, e.into()))?;
    Ok(value)
}

/// Sends a write request through the mutation runner.
#[tracing::instrument(skip(services, data, headers))]
pub async fn run_mutation(
    services: &Services,
    method: Method,
    endpoint: &str,
    data: Option<&str>,
    headers: &[(String, String)],
) -> Result<Value> {
    let body = data
        .map(|d| serde_json::from_str::<Value>(d).context("--data is not valid JSON"))
        .transpose()?;

    let mut options = RequestOptions::new(method).with_body(body);
    for (name, value) in headers {
        options = options.with_header(name.as_str(), value.as_str());
    }

    let client = &services.client;
    let value = services
        .queries
        .mutate(|| client.request::<Option<Value>>(endpoint, options.clone()))
        .await
        .map_err(|e| report(services, e.into()))?;
    Ok(value.unwrap_or(Value::Null))
}

/// Attaches what the error registry recorded to the returned error.
fn report(services: &Services, error: anyhow::Error) -> anyhow::Error {
    let recorded: Vec<ErrorRecord> = services.registry.drain();
    match recorded.first() {
        Some(record) => error.context(format!("[{}] request failed", record.code)),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::services::build_services;
    use crate::config::ApiClientConfig;
    use crate::http::{ApiError, RetryPolicy};
    use mockito::Matcher;
    use serde_json::json;

    fn services(url: &str) -> Services {
        build_services(ApiClientConfig::new(url), Some("tok"), RetryPolicy::default()).unwrap()
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("period=30d").unwrap(),
            ("period".to_string(), "30d".to_string())
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_parse_header_arg() {
        assert_eq!(
            parse_header_arg("X-Request-Id: abc").unwrap(),
            ("X-Request-Id".to_string(), "abc".to_string())
        );
        assert!(parse_header_arg("nocolon").is_err());
    }

    #[tokio::test]
    async fn test_run_query_with_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/analytics/usage/p1")
            .match_query(Matcher::UrlEncoded("period".into(), "7d".into()))
            .with_body(r#"{"requests": 5}"#)
            .create_async()
            .await;

        let services = services(&server.url());
        let value = run_query(
            &services,
            "/analytics/usage/p1",
            &[("period".to_string(), "7d".to_string())],
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(value, json!({"requests": 5}));
    }

    #[tokio::test]
    async fn test_run_query_error_carries_code() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/partners/p1")
            .with_status(404)
            .with_body(r#"{"message":"not found"}"#)
            .create_async()
            .await;

        let services = services(&server.url());
        let err = run_query(&services, "/partners/p1", &[]).await.unwrap_err();

        assert!(err.to_string().contains("QUERY_ERROR"));
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status(), 404);
    }

    #[tokio::test]
    async fn test_run_mutation_sends_body_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/partners/p1")
            .match_header("x-request-id", "r-9")
            .match_body(Matcher::Json(json!({"website": "https://x.test"})))
            .with_body(r#"{"id": "p1"}"#)
            .create_async()
            .await;

        let services = services(&server.url());
        let value = run_mutation(
            &services,
            Method::PATCH,
            "/partners/p1",
            Some(r#"{"website": "https://x.test"}"#),
            &[("X-Request-Id".to_string(), "r-9".to_string())],
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(value["id"], "p1");
    }

    #[tokio::test]
    async fn test_run_mutation_rejects_invalid_json() {
        let services = services("http://127.0.0.1:9");
        let err = run_mutation(&services, Method::POST, "/x", Some("{nope"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--data"));
    }

    #[tokio::test]
    async fn test_run_mutation_empty_response_is_null() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("DELETE", "/partners/p1/api-keys/k1")
            .with_status(204)
            .create_async()
            .await;

        let services = services(&server.url());
        let value = run_mutation(&services, Method::DELETE, "/partners/p1/api-keys/k1", None, &[])
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }
}
