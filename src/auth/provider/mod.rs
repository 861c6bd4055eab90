//! Authentication providers.
//!
//! A provider tries to resolve an [`Identity`] from the credentials a request
//! carries (a callback code, a header, a stub). Finding nothing is not an
//! error: the provider returns [`Identity::ANONYMOUS`]. Errors are reserved
//! for failures to reach the backing service.
//!
//! Providers are shared by every request, so implementations must be safe
//! for concurrent read-only use.

pub mod oauth;

pub use oauth::{OAuth2Config, OAuth2Provider};

use async_trait::async_trait;
use std::{fmt, sync::Arc};
use thiserror::Error;

use super::{identity::Identity, page::Link, request::RequestContext};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: transport failure: {source}")]
    Transport {
        provider: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{provider}: {message}")]
    Protocol { provider: String, message: String },
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in logs and link relations.
    fn name(&self) -> &str;

    /// Resolve the identity vouched for by this request, if any.
    async fn identity(&self, request: &RequestContext) -> Result<Identity, ProviderError>;

    /// Login entry point advertised to anonymous visitors.
    fn link(&self, request: &RequestContext) -> Link;
}

/// Ordered, immutable set of providers.
///
/// Order is precedence: the first provider to return a non-anonymous identity
/// wins and the rest are not consulted.
#[derive(Clone, Default)]
pub struct Providers(Arc<[Arc<dyn Provider>]>);

impl Providers {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self(providers.into())
    }

    #[must_use]
    pub fn builder() -> ProvidersBuilder {
        ProvidersBuilder::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|provider| provider.name()))
            .finish()
    }
}

#[derive(Default)]
pub struct ProvidersBuilder {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProvidersBuilder {
    #[must_use]
    pub fn with(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    #[must_use]
    pub fn with_shared(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn build(self) -> Providers {
        Providers::new(self.providers)
    }
}

/// Provider that vouches for the same identity on every request.
///
/// Meant for tests and local development.
#[derive(Clone, Debug)]
pub struct Always {
    identity: Identity,
}

impl Always {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl Provider for Always {
    fn name(&self) -> &str {
        "always"
    }

    async fn identity(&self, _request: &RequestContext) -> Result<Identity, ProviderError> {
        Ok(self.identity.clone())
    }

    fn link(&self, request: &RequestContext) -> Link {
        Link::new("auth-always", request.without_query())
    }
}
