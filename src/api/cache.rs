use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::esi::Endpoint;

/// Identifies one page of one resource on one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: Endpoint,
    pub resource_id: String,
    pub page: u32,
}

impl CacheKey {
    pub fn new(endpoint: Endpoint, resource_id: impl Into<String>, page: u32) -> Self {
        Self {
            endpoint,
            resource_id: resource_id.into(),
            page,
        }
    }
}

/// ETag store shared by every polling cycle of a run.
///
/// Cloning hands out another handle to the same map. Readers and writers on
/// different endpoints may interleave freely; a write for a key replaces the
/// previous token atomically.
#[derive(Debug, Clone, Default)]
pub struct RevalidationCache {
    tokens: Arc<RwLock<HashMap<CacheKey, String>>>,
}

impl RevalidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.tokens.read().await.get(key).cloned()
    }

    /// Empty tokens are ignored so an unchanged response can never wipe a good one.
    pub async fn store(&self, key: CacheKey, token: String) {
        if token.is_empty() {
            return;
        }
        self.tokens.write().await.insert(key, token);
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}
