//! Following aggregator wrapper links to the publisher's own URL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ResolveError;

const MAX_REDIRECTS: usize = 10;

/// Wrapper URL → final URL, shared by every lookup that receives it.
///
/// The owner decides the scope: `Aggregator::aggregate_all` builds a fresh
/// cache per run, `Aggregator::aggregate_with_cache` takes a longer-lived one.
/// Inserts never overwrite, so concurrent runs agree on the first answer.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        self.entries.read().await.get(url).cloned()
    }

    /// Insert-if-absent; returns the value now stored for `url`.
    pub async fn insert(&self, url: &str, resolved: &str) -> String {
        let mut entries = self.entries.write().await;
        entries
            .entry(url.to_string())
            .or_insert_with(|| resolved.to_string())
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
pub trait RedirectResolver: Send + Sync {
    /// The final URL reached from `url` after following redirects.
    async fn resolve(&self, url: &str) -> Result<String, ResolveError>;
}

/// Issues one GET per URL and reports where the redirects ended. Bodies are discarded.
pub struct HttpResolver {
    client: Client,
}

impl HttpResolver {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectResolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Result<String, ResolveError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ResolveError::Timeout
            } else {
                ResolveError::Http(e)
            }
        })?;
        Ok(response.url().to_string())
    }
}

/// Resolve through the cache, populating it on a miss.
pub async fn resolve_cached(
    resolver: &dyn RedirectResolver,
    cache: &ResolutionCache,
    url: &str,
) -> Result<String, ResolveError> {
    if let Some(hit) = cache.get(url).await {
        debug!("Resolution cache hit for {}", url);
        return Ok(hit);
    }

    let resolved = resolver.resolve(url).await?;
    debug!("Resolved {} -> {}", url, resolved);
    Ok(cache.insert(url, &resolved).await)
}
