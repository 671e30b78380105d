//! SocialData API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use url::Url;

use crate::api::source::{AssetTransport, FeedSource};
use crate::api::types::{SearchResponse, UserProfile};
use crate::error::{Error, Result};
use crate::record::Record;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.socialdata.tools/twitter/";

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// API client for the feed and profile endpoints, also used for media downloads.
pub struct SocialDataApi {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl SocialDataApi {
    /// Create a new API client.
    pub fn new(
        api_key: String,
        base_url: &str,
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        // Url::join drops the last segment unless the base ends with a slash
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Make an authenticated GET request, turning non-success statuses into errors.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = self.base_url.join(path)?;

        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        Ok(response)
    }

    /// Search posts of a user, optionally below a maximum id.
    pub async fn search(&self, username: &str, max_id: Option<&str>) -> Result<Vec<Record>> {
        let query = build_query(username, max_id);
        let response = self.get("search", &[("query", query.as_str())]).await?;
        let text = response.text().await?;

        let parsed: SearchResponse = serde_json::from_str(&text).map_err(|e| Error::Upstream {
            status: 200,
            body: format!("Failed to parse search response: {} - {}", e, truncate(&text)),
        })?;

        tracing::debug!(
            "Retrieved {} tweets for {}",
            parsed.tweets.len(),
            username
        );

        Ok(parsed.tweets.into_iter().map(Record::from_value).collect())
    }

    /// Get a user's profile.
    pub async fn get_user(&self, username: &str) -> Result<UserProfile> {
        let response = self.get(&format!("user/{}", username), &[]).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| Error::Upstream {
            status: 200,
            body: format!("Failed to parse user profile: {} - {}", e, truncate(&text)),
        })
    }

    /// Download a file from a URL without API credentials.
    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        // Only a full 200 carries the asset body
        if response.status() != StatusCode::OK {
            return Err(Error::Download(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Download(format!("Stream error: {}", e)))?;
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl FeedSource for SocialDataApi {
    async fn fetch_feed(&self, key: &str, cursor: Option<&str>) -> Result<Vec<Record>> {
        self.search(key, cursor).await
    }

    async fn total_count(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.get_user(key).await?.statuses_count)
    }
}

#[async_trait]
impl AssetTransport for SocialDataApi {
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        self.download_file(url).await
    }
}

/// `from:<user>[ max_id:<cursor>]`
pub fn build_query(username: &str, max_id: Option<&str>) -> String {
    match max_id {
        Some(max_id) => format!("from:{} max_id:{}", username, max_id),
        None => format!("from:{}", username),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}
