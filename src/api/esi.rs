use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{CacheKey, RevalidationCache};
use super::error::ApiError;
use super::transport::{HttpTransport, ReqwestTransport};
use super::types::{LineItem, Listing};
use crate::core::config::EsiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Listings,
    LineItems,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Listings => "/latest/contracts/public/",
            Endpoint::LineItems => "/latest/contracts/public/items/",
        }
    }
}

/// Page-at-a-time client for the public contracts endpoints.
pub struct EsiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    datasource: String,
    cache: RevalidationCache,
}

impl EsiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &EsiConfig,
        cache: RevalidationCache,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            transport,
            base_url,
            datasource: config.datasource.clone(),
            cache,
        })
    }

    /// Builds a client on top of reqwest.
    pub fn from_config(config: &EsiConfig, cache: RevalidationCache) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )?;
        Self::new(Arc::new(transport), config, cache)
    }

    pub fn cache(&self) -> &RevalidationCache {
        &self.cache
    }

    fn page_url(&self, endpoint: Endpoint, resource_id: &str, page: u32) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(&format!("{}{}", endpoint.path(), resource_id))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("datasource", &self.datasource)
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// Fetches one page of `endpoint` for `resource_id`.
    ///
    /// A cached ETag for the same page is replayed as `If-None-Match`. Fresh
    /// data refreshes the token and a 304 yields an empty page. 404, any other
    /// bodyless success (204) and an empty array mean [`ApiError::Exhausted`].
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        resource_id: &str,
        page: u32,
        cache: &RevalidationCache,
    ) -> Result<Vec<T>, ApiError> {
        let url = self.page_url(endpoint, resource_id, page)?;
        let key = CacheKey::new(endpoint, resource_id, page);
        let etag = cache.get(&key).await;

        let response = self.transport.get(url, etag).await?;
        check_status(response.status)?;

        if response.status == StatusCode::NOT_MODIFIED {
            tracing::debug!(
                "{}{} page {} unchanged",
                endpoint.path(),
                resource_id,
                page
            );
            return Ok(Vec::new());
        }
        // 204 and friends carry no page at all
        if response.status != StatusCode::OK {
            return Err(ApiError::Exhausted);
        }

        let data: Vec<T> = serde_json::from_str(&response.body)?;
        if data.is_empty() {
            return Err(ApiError::Exhausted);
        }

        if let Some(etag) = response.etag {
            cache.store(key, etag).await;
        }

        Ok(data)
    }

    pub async fn get_listings(&self, region_id: &str, page: u32) -> Result<Vec<Listing>, ApiError> {
        self.fetch_page(Endpoint::Listings, region_id, page, &self.cache)
            .await
    }

    /// Each listing is evaluated once, so its line-item tokens would never be
    /// replayed and are not kept.
    pub async fn get_line_items(&self, listing_id: i64, page: u32) -> Result<Vec<LineItem>, ApiError> {
        let scratch = RevalidationCache::new();
        self.fetch_page(Endpoint::LineItems, &listing_id.to_string(), page, &scratch)
            .await
    }
}

fn check_status(status: StatusCode) -> Result<(), ApiError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::Exhausted);
    }
    if status.is_client_error() || status.is_server_error() {
        return Err(ApiError::Transport { status });
    }
    Ok(())
}
