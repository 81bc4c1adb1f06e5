//! Protocol module for chat completion request/response structures
//!
//! This module defines the data exchanged with the completion endpoint and the
//! wire-format independent [`StreamChunk`] consumed by the transport's fold.

pub mod types;

pub use types::{
    ChatRequest, ChatResponse, ChatStreamChunk, CompletionUsage, Message, MessageDelta,
    MessageRole, ResponseChoice, ResponseMessage, StreamChoice, StreamChunk,
};
