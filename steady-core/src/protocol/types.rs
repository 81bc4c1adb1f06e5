//! Core protocol types for chat completions
//!
//! These structures follow the OpenAI-compatible chat completion wire format.
//! Only the fields the client actually sends or reads are modelled; unknown
//! response fields are ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// A role-tagged message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message
    pub content: String,
}

/// Chat completion request
///
/// Built once per ask and borrowed immutably by every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier to use
    pub model: String,

    /// Messages in the conversation, oldest first
    pub messages: Vec<Message>,

    /// Sampling temperature, forwarded as-is
    pub temperature: f32,

    /// Whether the endpoint should stream the response
    pub stream: bool,
}

/// Complete chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response ID
    #[serde(default)]
    pub id: String,

    /// Model used for generation
    #[serde(default)]
    pub model: String,

    /// Response choices
    pub choices: Vec<ResponseChoice>,

    /// Token usage information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

/// Response choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseChoice {
    /// Choice index
    #[serde(default)]
    pub index: usize,

    /// Generated message
    pub message: ResponseMessage,

    /// Finish reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Message returned inside a response choice
///
/// `content` is nullable on the wire (e.g. for tool-call only replies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: MessageRole,

    #[serde(default)]
    pub content: Option<String>,
}

/// Streaming response chunk as sent in each SSE `data:` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    /// Delta choices; may be empty (e.g. a trailing usage-only chunk)
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

/// Streaming choice with delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub delta: MessageDelta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Delta message for streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageDelta {
    /// Role (only in first chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,

    /// Content delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Wire-format independent unit of a streaming response
///
/// Carries zero or one text fragment. Chunks without a fragment (role
/// announcements, finish markers, usage trailers) contribute nothing to the
/// assembled text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    pub fragment: Option<String>,
}

impl StreamChunk {
    /// Create a chunk carrying a text fragment
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            fragment: Some(fragment.into()),
        }
    }

    /// Create a chunk without any text
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<ChatStreamChunk> for StreamChunk {
    fn from(chunk: ChatStreamChunk) -> Self {
        Self {
            fragment: chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content),
        }
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl Message {
    /// Create a message with the given role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl ChatRequest {
    /// Create a new non-streaming chat request with model and messages
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 1.0,
            stream: false,
        }
    }

    /// Set streaming mode
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl ChatResponse {
    /// Text content of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_wire_fields() {
        let request = ChatRequest::new("gpt-4o", vec![Message::user("hi")])
            .with_temperature(0.5)
            .with_streaming(true);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "hi"}],
                "temperature": 0.5,
                "stream": true
            })
        );
    }

    #[test]
    fn test_response_ignores_unknown_fields() {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o",
            "system_fingerprint": "fp",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop",
                "logprobs": null
            }]
        });

        let response: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.first_content(), Some("hello"));
    }

    #[test]
    fn test_stream_chunk_conversion() {
        let with_text: ChatStreamChunk = serde_json::from_value(json!({
            "id": "c", "model": "m",
            "choices": [{"index": 0, "delta": {"content": "Hel"}}]
        }))
        .unwrap();
        assert_eq!(StreamChunk::from(with_text), StreamChunk::text("Hel"));

        let role_only: ChatStreamChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {"role": "assistant"}}]
        }))
        .unwrap();
        assert_eq!(StreamChunk::from(role_only), StreamChunk::empty());

        let usage_only: ChatStreamChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }))
        .unwrap();
        assert_eq!(StreamChunk::from(usage_only).fragment, None);
    }
}
