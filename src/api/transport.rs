use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use super::error::ApiError;

/// What the client needs back from a GET: status, revalidation token, body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub etag: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, etag: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            etag: etag.map(str::to_string),
            body: body.into(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: Url, if_none_match: Option<String>) -> Result<RawResponse, ApiError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: Url, if_none_match: Option<String>) -> Result<RawResponse, ApiError> {
        let mut request = self.client.get(url);
        if let Some(etag) = if_none_match {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Bodies of non-200 answers are never decoded
        let body = if status == StatusCode::OK {
            response.text().await?
        } else {
            String::new()
        };

        Ok(RawResponse { status, etag, body })
    }
}
