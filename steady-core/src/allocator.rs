//! Endpoint allocation
//!
//! A client asks the allocator once, at construction, for the endpoint it will
//! talk to for the rest of its life. The allocator is injected, so tests and
//! embedding applications can supply their own credentials source.

use crate::config::{EndpointConfig, SecretString, SteadyConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::info;

/// Connection details handed out for one model family
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointGrant {
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// API key for the endpoint
    pub api_key: SecretString,

    /// Model identifier to request
    pub model: String,
}

/// Errors raised while allocating an endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("No enabled endpoint serves model family '{0}'")]
    UnknownFamily(String),
}

/// Source of endpoint credentials
pub trait EndpointAllocator: Send + Sync {
    /// Pick an endpoint and model for the given family
    fn allocate(&self, model_family: &str) -> Result<EndpointGrant, AllocationError>;
}

/// Allocator backed by the `endpoints` section of the configuration
///
/// Successive allocations for the same family cycle round-robin through every
/// (endpoint, model) pair of that family, so clients created one after another
/// spread across keys and models.
#[derive(Debug)]
pub struct ConfigAllocator {
    endpoints: Vec<EndpointConfig>,
    cursor: AtomicUsize,
}

impl ConfigAllocator {
    /// Build an allocator over the enabled endpoints of a config
    pub fn new(config: &SteadyConfig) -> Self {
        Self::from_endpoints(config.endpoints.clone())
    }

    /// Build an allocator over an explicit endpoint list
    pub fn from_endpoints(endpoints: Vec<EndpointConfig>) -> Self {
        Self {
            endpoints: endpoints.into_iter().filter(|e| e.enabled).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    fn candidates<'a>(
        &'a self,
        model_family: &'a str,
    ) -> impl Iterator<Item = (&'a EndpointConfig, &'a String)> + 'a {
        self.endpoints
            .iter()
            .filter(move |e| e.family.eq_ignore_ascii_case(model_family))
            .flat_map(|e| e.models.iter().map(move |m| (e, m)))
    }
}

impl EndpointAllocator for ConfigAllocator {
    fn allocate(&self, model_family: &str) -> Result<EndpointGrant, AllocationError> {
        let total = self.candidates(model_family).count();
        if total == 0 {
            return Err(AllocationError::UnknownFamily(model_family.to_string()));
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % total;
        let (endpoint, model) = self
            .candidates(model_family)
            .nth(index)
            .ok_or_else(|| AllocationError::UnknownFamily(model_family.to_string()))?;

        info!(
            "Allocated {} model {} at {} (key {})",
            model_family,
            model,
            endpoint.base_url,
            endpoint.api_key.partial_redact()
        );

        Ok(EndpointGrant {
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
            model: model.clone(),
        })
    }
}

/// Allocator always returning the same grant
#[derive(Debug, Clone)]
pub struct FixedAllocator {
    grant: EndpointGrant,
}

impl FixedAllocator {
    pub fn new(grant: EndpointGrant) -> Self {
        Self { grant }
    }
}

impl EndpointAllocator for FixedAllocator {
    fn allocate(&self, _model_family: &str) -> Result<EndpointGrant, AllocationError> {
        Ok(self.grant.clone())
    }
}
