//! Uniform error shape for every failed API call.

use reqwest::StatusCode;
use serde_json::{Value, json};

/// Status used when the request never produced an HTTP response.
pub const NETWORK_ERROR_STATUS: u16 = 0;

/// Status used when the client gave up waiting for a response.
pub const TIMEOUT_STATUS: u16 = 408;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call exceeded the configured timeout.
    Timeout,
    /// Transport failure, no usable response.
    Network,
    /// HTTP 401 or 403.
    Auth,
    /// Any other non-success HTTP status.
    Http,
}

/// Error returned by every [`ApiClient`](super::ApiClient) call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: u16,
    message: String,
    data: Option<Value>,
    /// Set only when the client itself gave up; a server's own 408 leaves it false.
    timed_out: bool,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status,
            message: message.into(),
            data,
            timed_out: false,
        }
    }

    pub fn timeout(timeout_ms: u128) -> Self {
        Self {
            timed_out: true,
            ..Self::new(
                TIMEOUT_STATUS,
                "Request timeout",
                Some(json!({ "originalError": format!("no response within {}ms", timeout_ms) })),
            )
        }
    }

    pub fn network(original: impl std::fmt::Display) -> Self {
        Self::new(
            NETWORK_ERROR_STATUS,
            "Network error",
            Some(json!({ "originalError": original.to_string() })),
        )
    }

    /// Builds the error for a non-success response from its status and raw body.
    ///
    /// A JSON body supplies the message (when it has a string `message` field) and
    /// becomes `data`. A non-JSON body is kept verbatim under `data.raw` and the
    /// message falls back to the status reason phrase.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let reason = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if body.trim().is_empty() {
            return Self::new(status.as_u16(), reason, None);
        }

        match serde_json::from_str::<Value>(body) {
            Ok(data) => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .unwrap_or(reason);
                Self::new(status.as_u16(), message, Some(data))
            }
            Err(_) => Self::new(status.as_u16(), reason, Some(json!({ "raw": body }))),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Application error code sent by the server in the body's `code` field, if any.
    pub fn code(&self) -> Option<&str> {
        self.data.as_ref()?.get("code")?.as_str()
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status {
            NETWORK_ERROR_STATUS => ErrorKind::Network,
            TIMEOUT_STATUS if self.timed_out => ErrorKind::Timeout,
            401 | 403 => ErrorKind::Auth,
            _ => ErrorKind::Http,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// JSON snapshot of the whole error, used as details in the error registry.
    pub fn to_details(&self) -> Value {
        json!({
            "status": self.status,
            "message": self.message,
            "data": self.data,
        })
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            NETWORK_ERROR_STATUS => write!(f, "{}", self.message),
            status => write!(f, "HTTP {}: {}", status, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_json_message() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, r#"{"message":"not found"}"#);
        assert_eq!(err.status(), 404);
        assert_eq!(err.message(), "not found");
        assert_eq!(err.data(), Some(&json!({"message": "not found"})));
    }

    #[test]
    fn test_from_response_json_without_message_uses_reason() {
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"errors":["bad"]}"#);
        assert_eq!(err.status(), 400);
        assert_eq!(err.message(), "Bad Request");
        assert!(err.data().is_some());
    }

    #[test]
    fn test_from_response_empty_body() {
        let err = ApiError::from_response(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.status(), 503);
        assert_eq!(err.message(), "Service Unavailable");
        assert!(err.data().is_none());
    }

    #[test]
    fn test_from_response_malformed_body_keeps_raw_text() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.data(), Some(&json!({"raw": "<html>upstream down</html>"})));
    }

    #[test]
    fn test_code_from_body() {
        let err = ApiError::from_response(
            StatusCode::CONFLICT,
            r#"{"message":"exists","code":"KEY_EXISTS"}"#,
        );
        assert_eq!(err.code(), Some("KEY_EXISTS"));
        assert_eq!(ApiError::network("boom").code(), None);
    }

    #[test]
    fn test_kind() {
        assert_eq!(ApiError::timeout(30000).kind(), ErrorKind::Timeout);
        assert_eq!(ApiError::network("refused").kind(), ErrorKind::Network);
        assert_eq!(ApiError::new(401, "no", None).kind(), ErrorKind::Auth);
        assert_eq!(ApiError::new(403, "no", None).kind(), ErrorKind::Auth);
        assert_eq!(ApiError::new(408, "Request Timeout", None).kind(), ErrorKind::Http);
        assert_eq!(ApiError::new(500, "oops", None).kind(), ErrorKind::Http);
    }

    #[test]
    fn test_server_408_is_not_a_client_timeout() {
        let err = ApiError::from_response(
            StatusCode::REQUEST_TIMEOUT,
            r#"{"message":"Request timeout"}"#,
        );
        assert_eq!(err.status(), 408);
        assert_eq!(err.message(), "Request timeout");
        assert_eq!(err.kind(), ErrorKind::Http);
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiError::new(404, "not found", None).to_string(), "HTTP 404: not found");
        assert_eq!(ApiError::network("refused").to_string(), "Network error");
        assert_eq!(ApiError::timeout(10).to_string(), "HTTP 408: Request timeout");
    }
}
