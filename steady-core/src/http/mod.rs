//! HTTP transport for the completion endpoint
//!
//! This module implements the single-attempt layer of the client:
//! - Connection pooling and session management
//! - Non-streaming and SSE streaming completions
//! - Error mapping and retry hints
//! - Request ID generation and correlation
//!
//! Nothing in here retries; see [`crate::resilience`] for that.

pub mod client;
pub mod error;
pub mod streaming;

pub use client::HttpTransport;
pub use error::{TransportError, TransportResult};
pub use streaming::{collect_fragments, parse_stream, ChunkStream};

use crate::protocol::ChatRequest;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Endpoint path for chat completions, relative to the base URL
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Options for one HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout,
        }
    }
}

/// One request/response cycle against the completion endpoint
///
/// Returns the assembled text of the completion. Implementations perform no
/// retry and report every failure as a [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the full completion text
    async fn send(&self, request: &ChatRequest) -> TransportResult<String>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> TransportResult<String> {
        (**self).send(request).await
    }
}
