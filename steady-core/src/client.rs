//! Conversation-level client
//!
//! [`LlmClient`] is what agents hold on to: it owns the allocated endpoint,
//! the resilience controller and, optionally, the conversation memory.
//! Memory is only touched through `&mut self`, so two asks can never race on
//! the same instance; run one client per agent for concurrency.

use crate::allocator::{AllocationError, EndpointAllocator};
use crate::config::{ClientOptions, SteadyConfig};
use crate::http::{HttpTransport, Transport, TransportError};
use crate::logging::LogSink;
use crate::protocol::{ChatRequest, Message};
use crate::resilience::{AskError, ResilienceController, RetryPolicy};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while constructing a client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Endpoint allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// Resilient chat client bound to one model
pub struct LlmClient<T = HttpTransport> {
    controller: ResilienceController<T>,
    model: String,
    options: ClientOptions,
    memories: Vec<Message>,
}

impl LlmClient<HttpTransport> {
    /// Allocate an endpoint for `model_family` and build an HTTP-backed client
    ///
    /// The allocator is consulted exactly once.
    pub fn connect(
        allocator: &dyn EndpointAllocator,
        model_family: &str,
        config: &SteadyConfig,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ClientError> {
        let grant = allocator.allocate(model_family)?;
        let transport = HttpTransport::new(
            grant.base_url,
            grant.api_key,
            &config.connection,
            Arc::clone(&sink),
        )?;

        Ok(Self::with_transport(
            transport,
            grant.model,
            config.client.clone(),
            RetryPolicy::from(&config.resilience),
            sink,
        ))
    }
}

impl<T: Transport> LlmClient<T> {
    /// Build a client over any transport
    pub fn with_transport(
        transport: T,
        model: impl Into<String>,
        options: ClientOptions,
        policy: RetryPolicy,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            controller: ResilienceController::new(transport, policy, sink),
            model: model.into(),
            options,
            memories: Vec::new(),
        }
    }

    /// Model identifier every request targets
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn controller(&self) -> &ResilienceController<T> {
        &self.controller
    }

    /// Conversation memory, oldest first
    pub fn memories(&self) -> &[Message] {
        &self.memories
    }

    /// Add a message to the context sent with every later ask
    pub fn append_to_memory(&mut self, message: Message) {
        self.memories.push(message);
    }

    pub fn clear_memory(&mut self) {
        self.memories.clear();
    }

    /// Request an ask with `prompt` would send
    pub fn build_request(&self, prompt: &str, temperature: f32) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.memories.len() + 2);
        if let Some(system_prompt) = &self.options.system_prompt {
            messages.push(Message::system(system_prompt.as_str()));
        }
        messages.extend(self.memories.iter().cloned());
        messages.push(Message::user(prompt));

        ChatRequest::new(self.model.as_str(), messages)
            .with_temperature(temperature)
            .with_streaming(self.options.stream)
    }

    /// Ask the model and wait until it answers
    ///
    /// Retries through both tiers; only returns an error when the policy has
    /// a maximum total duration. With `memorize` on, the prompt and the reply
    /// are appended to memory after success.
    pub async fn ask(&mut self, prompt: &str, temperature: f32) -> Result<String, AskError> {
        let request = self.build_request(prompt, temperature);
        debug!(
            "Asking {} with {} messages (stream: {})",
            self.model,
            request.messages.len(),
            request.stream
        );

        let reply = self.controller.execute(&request).await?;

        if self.options.memorize {
            self.memories.push(Message::user(prompt));
            self.memories.push(Message::assistant(reply.as_str()));
        }

        Ok(reply)
    }

    /// Ask with the configured default temperature
    pub async fn ask_default(&mut self, prompt: &str) -> Result<String, AskError> {
        let temperature = self.options.default_temperature;
        self.ask(prompt, temperature).await
    }
}
