//! Steady Core Library
//!
//! A completion client for OpenAI-compatible endpoints that does not give up:
//! transient failures are absorbed by exponential backoff, longer outages by
//! a periodic sleep-and-retry loop.
//!
//! ```no_run
//! use std::sync::Arc;
//! use steady_core::allocator::ConfigAllocator;
//! use steady_core::logging::TracingSink;
//! use steady_core::LlmClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = steady_core::config::load("steady.yaml")?;
//! let allocator = ConfigAllocator::new(&config);
//! let mut client = LlmClient::connect(&allocator, "GPT", &config, Arc::new(TracingSink))?;
//! let reply = client.ask("Write a haiku about retries", 0.7).await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod client;
pub mod config;
pub mod http;
pub mod logging;
pub mod protocol;
pub mod resilience;

pub use allocator::{ConfigAllocator, EndpointAllocator, EndpointGrant};
pub use client::{ClientError, LlmClient};
pub use http::{HttpTransport, Transport, TransportError};
pub use logging::{LogLevel, LogSink};
pub use resilience::{AskError, ResilienceController, RetryPolicy};

/// Returns the version of the Steady Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
