//! Transport error type and HTTP error mapping utilities

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure of a single request/response cycle against the completion endpoint
///
/// The resilience controller retries every variant; none of them reaches the
/// caller of an ask.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Connection could not be established or broke mid-request
    #[error("Network error: {message}")]
    Network { message: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Endpoint rejected the credentials
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Endpoint is rate limiting this client
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Incremental response broke off or carried an invalid event
    #[error("Stream interrupted: {0}")]
    Stream(String),

    /// Completion carried no choices
    #[error("Response contained no choices")]
    EmptyResponse,

    /// Transport could not be set up
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Server-suggested wait before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Network {
                message: format!("Connection failed: {}", err),
            }
        } else if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TransportError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Parse(err.to_string())
    }
}

/// Map HTTP status code, headers and response body to a TransportError
pub fn map_http_error(
    status: StatusCode,
    headers: Option<&HeaderMap>,
    body: Option<String>,
    request_id: Uuid,
) -> TransportError {
    let error_details = body
        .as_ref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_details(&v));

    let error_message = error_details
        .as_ref()
        .map(|d| d.message.clone())
        .or_else(|| body.clone().filter(|b| !b.is_empty()))
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));

    let message_with_id = format!("{} [request_id: {}]", error_message, request_id);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Authentication {
            message: message_with_id,
        },

        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = headers
                .and_then(|h| h.get(RETRY_AFTER))
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .or_else(|| {
                    error_details
                        .and_then(|d| d.retry_after_seconds)
                        .map(Duration::from_secs)
                });

            TransportError::RateLimit {
                message: message_with_id,
                retry_after,
            }
        }

        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => TransportError::Timeout,

        status => TransportError::Status {
            status: status.as_u16(),
            message: message_with_id,
        },
    }
}

/// Error details extracted from response body
struct ErrorDetails {
    message: String,
    retry_after_seconds: Option<u64>,
}

/// Extract error details from JSON response
fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: error.get("retry_after").and_then(|v| v.as_u64()),
            });
        }
    }

    // Generic format: { "message": "..." }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: message.to_string(),
            retry_after_seconds: json.get("retry_after").and_then(|v| v.as_u64()),
        });
    }

    if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: error.to_string(),
            retry_after_seconds: None,
        });
    }

    None
}

/// Parse Retry-After header value
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    // HTTP-date form is not handled
    header_value
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use test_case::test_case;

    #[test_case(401 ; "unauthorized")]
    #[test_case(403 ; "forbidden")]
    fn test_auth_statuses(code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let error = map_http_error(status, None, None, Uuid::nil());
        assert!(matches!(error, TransportError::Authentication { .. }));
    }

    #[test_case(408 ; "request timeout")]
    #[test_case(504 ; "gateway timeout")]
    fn test_timeout_statuses(code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        assert_eq!(
            map_http_error(status, None, None, Uuid::nil()),
            TransportError::Timeout
        );
    }

    #[test]
    fn test_openai_error_body_message() {
        let body = r#"{"error": {"message": "The server is overloaded", "type": "server_error"}}"#;
        let error = map_http_error(
            StatusCode::SERVICE_UNAVAILABLE,
            None,
            Some(body.to_string()),
            Uuid::nil(),
        );

        match error {
            TransportError::Status { status, message } => {
                assert_eq!(status, 503);
                assert!(message.starts_with("The server is overloaded"));
                assert!(message.contains("request_id"));
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let body = r#"{"error": {"message": "slow down", "retry_after": 30}}"#;

        let error = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(&headers),
            Some(body.to_string()),
            Uuid::nil(),
        );
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));

        let error = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            Some(body.to_string()),
            Uuid::nil(),
        );
        assert_eq!(error.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(" 3 "), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
