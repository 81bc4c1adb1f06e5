//! HTTP transport implementation using reqwest

use super::error::{map_http_error, TransportError, TransportResult};
use super::streaming::{collect_fragments, parse_stream};
use super::{RequestOptions, Transport, CHAT_COMPLETIONS_PATH};
use crate::config::{ConnectionConfig, SecretString};
use crate::logging::{LogLevel, LogSink};
use crate::protocol::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum non-streaming response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("steady/", env!("CARGO_PKG_VERSION"));

/// Transport talking to an OpenAI-compatible `/chat/completions` endpoint
///
/// The underlying session is pooled and shared between clones.
#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
    base_url: String,
    api_key: SecretString,
    request_timeout: Duration,
    max_response_size: usize,
    sink: Arc<dyn LogSink>,
}

impl HttpTransport {
    /// Create a transport for one endpoint
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        connection: &ConnectionConfig,
        sink: Arc<dyn LogSink>,
    ) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(connection.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(connection.keepalive_secs))
            .connect_timeout(Duration::from_millis(connection.connect_timeout_ms))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| {
                TransportError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_millis(connection.request_timeout_ms),
            max_response_size: MAX_RESPONSE_SIZE,
            sink,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH)
    }

    /// Validate response content type for non-streaming responses
    fn validate_content_type(response: &Response) -> TransportResult<()> {
        if let Some(content_type) = response.headers().get("content-type") {
            let content_type_str = content_type.to_str().unwrap_or("").to_lowercase();

            if !content_type_str.contains("application/json") {
                return Err(TransportError::Parse(format!(
                    "Expected application/json, got: {}",
                    content_type_str
                )));
            }
        }

        Ok(())
    }

    /// Streaming responses must be an event stream; anything else would parse as zero events
    fn validate_event_stream(response: &Response) -> TransportResult<()> {
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !content_type.contains("text/event-stream") {
            return Err(TransportError::Parse(format!(
                "Expected text/event-stream, got: {}",
                if content_type.is_empty() { "no content type" } else { &content_type }
            )));
        }

        Ok(())
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> TransportResult<()> {
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_response_size as u64 {
                return Err(TransportError::Parse(format!(
                    "Response size {} exceeds maximum {}",
                    content_length, self.max_response_size
                )));
            }
        }

        Ok(())
    }

    async fn execute(
        &self,
        request: &ChatRequest,
        options: &RequestOptions,
    ) -> TransportResult<String> {
        let request_id = options.request_id;
        let url = self.url();
        debug!(
            "POST {} model={} stream={} messages={} [request_id: {}]",
            url,
            request.model,
            request.stream,
            request.messages.len(),
            request_id
        );

        let response = self
            .client
            .post(&url)
            .timeout(options.timeout)
            .bearer_auth(self.api_key.expose_secret())
            .header("X-Request-ID", request_id.to_string())
            .json(request)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.ok();

            warn!(
                "Request failed with status {} [request_id: {}]",
                status, request_id
            );

            return Err(map_http_error(status, Some(&headers), body, request_id));
        }

        let text = if request.stream {
            Self::validate_event_stream(&response)?;
            collect_fragments(parse_stream(response.bytes_stream())).await?
        } else {
            Self::validate_content_type(&response)?;
            self.check_content_length(&response)?;

            let body = response.text().await.map_err(|e| TransportError::Network {
                message: format!(
                    "Failed to read response body: {} [request_id: {}]",
                    e, request_id
                ),
            })?;

            let completion: ChatResponse = serde_json::from_str(&body).map_err(|e| {
                TransportError::Parse(format!(
                    "Invalid response format: {} [request_id: {}]",
                    e, request_id
                ))
            })?;

            if completion.choices.is_empty() {
                return Err(TransportError::EmptyResponse);
            }

            completion.first_content().unwrap_or_default().to_string()
        };

        info!(
            "Completion received ({} chars) [request_id: {}]",
            text.len(),
            request_id
        );

        Ok(text)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> TransportResult<String> {
        let options = RequestOptions::new(self.request_timeout);
        let result = self.execute(request, &options).await;

        if let Err(ref e) = result {
            self.sink.log(
                &format!("Error in send [request_id: {}]: {}", options.request_id, e),
                LogLevel::Error,
            );
        }

        result
    }
}
