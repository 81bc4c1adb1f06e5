//! Ask a model the same prompt several times
//!
//! Every ask retries until it succeeds, so an endpoint outage only makes the
//! demo slower.
//!
//! Run with: cargo run --example ask -- steady.yaml GPT "Tell me a joke" 3

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use steady_core::allocator::ConfigAllocator;
use steady_core::logging::TracingSink;
use steady_core::LlmClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "steady.yaml".to_string());
    let family = args.next().unwrap_or_else(|| "GPT".to_string());
    let prompt = args
        .next()
        .unwrap_or_else(|| "Explain exponential backoff in one sentence.".to_string());
    let runs: usize = match args.next() {
        Some(n) => n.parse().context("run count must be a positive integer")?,
        None => 1,
    };

    let config = steady_core::config::load(&config_path)
        .with_context(|| format!("loading {}", config_path))?;
    let allocator = ConfigAllocator::new(&config);

    for run in 1..=runs {
        let mut client = LlmClient::connect(&allocator, &family, &config, Arc::new(TracingSink))
            .with_context(|| format!("connecting to a {} endpoint", family))?;

        let reply = client.ask_default(&prompt).await?;
        println!("[{}/{}] {}: {}", run, runs, client.model(), reply);
    }

    Ok(())
}
