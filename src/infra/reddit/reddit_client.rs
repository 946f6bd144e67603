use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::core::feeds::{FeedError, FeedItem, FeedSource};

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";

/// Refresh the token this long before Reddit says it expires.
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// App credentials from https://www.reddit.com/prefs/apps ("script" or "web app").
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Minimal Reddit API client using application-only OAuth.
/// It exposes only the listing call the core layer needs.
pub struct RedditClient {
    client: Client,
    credentials: RedditCredentials,
    auth_url: String,
    api_url: String,
    token: RwLock<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, FeedError> {
        Self::with_endpoints(credentials, AUTH_URL, API_URL)
    }

    /// Same client, aimed at a different token endpoint and API base.
    pub fn with_endpoints(
        credentials: RedditCredentials,
        auth_url: &str,
        api_url: &str,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(credentials.user_agent.clone())
            // Reddit answers unknown subreddits with a redirect to its search page
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FeedError::Source(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            auth_url: auth_url.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, FeedError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let resp = self
            .client
            .post(&self.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| FeedError::Source(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FeedError::Source(format!(
                "Reddit rejected the app credentials ({})",
                resp.status()
            )));
        }

        let token: ApiToken = resp
            .json()
            .await
            .map_err(|e| FeedError::Source(e.to_string()))?;
        let value = token.access_token.ok_or_else(|| {
            FeedError::Source(format!(
                "Reddit did not return an access token: {}",
                token.error.unwrap_or_else(|| "unknown error".to_string())
            ))
        })?;

        let lifetime = token
            .expires_in
            .unwrap_or(3600)
            .saturating_sub(TOKEN_REFRESH_MARGIN_SECS);
        *self.token.write().await = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        tracing::debug!(expires_in = lifetime, "Fetched new Reddit access token");
        Ok(value)
    }
}

#[async_trait]
impl FeedSource for RedditClient {
    async fn fetch_new(&self, feed: &str, limit: usize) -> Result<Vec<FeedItem>, FeedError> {
        let token = self.access_token().await?;
        let url = format!("{}/r/{}/new", self.api_url, feed);

        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .map_err(|e| FeedError::Source(e.to_string()))?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => {
                // Force a fresh token on the next call
                *self.token.write().await = None;
                return Err(FeedError::Source(
                    "Reddit rejected the access token".to_string(),
                ));
            }
            StatusCode::FORBIDDEN => {
                return Err(FeedError::Source(format!(
                    "r/{feed} is private or quarantined"
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(FeedError::Source(format!("r/{feed} is banned or missing")));
            }
            s if s.is_redirection() => {
                return Err(FeedError::Source(format!("r/{feed} does not exist")));
            }
            s if !s.is_success() => {
                return Err(FeedError::Source(format!(
                    "Reddit returned {s} for r/{feed}"
                )));
            }
            _ => {}
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Source(e.to_string()))?;
        parse_listing(&body)
    }
}

/// Parse a `/new` listing body into feed items, keeping Reddit's order.
pub fn parse_listing(body: &str) -> Result<Vec<FeedItem>, FeedError> {
    let listing: ApiListing = serde_json::from_str(body)
        .map_err(|e| FeedError::Source(format!("Malformed listing: {e}")))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .filter(|child| child.kind.as_deref().map_or(true, |kind| kind == "t3"))
        .filter_map(|child| map_post(child.data))
        .collect())
}

fn map_post(api: ApiPost) -> Option<FeedItem> {
    let id = api.id?;
    let url = api
        .url
        .filter(|u| !u.is_empty())
        .or_else(|| {
            api.permalink
                .as_ref()
                .map(|p| format!("https://www.reddit.com{p}"))
        })
        .unwrap_or_else(|| format!("https://www.reddit.com/comments/{id}"));

    Some(FeedItem {
        title: api.title.unwrap_or_else(|| "Untitled post".to_string()),
        url,
        created_at: api
            .created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        body: api.selftext.filter(|text| !text.is_empty()),
        author: api.author.unwrap_or_else(|| "[deleted]".to_string()),
        preview_image_url: api
            .preview
            .and_then(|p| p.images.into_iter().next())
            .and_then(|image| image.source)
            .and_then(|source| source.url),
        id,
    })
}

#[derive(Debug, Deserialize)]
struct ApiToken {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiListing {
    data: ApiListingData,
}

#[derive(Debug, Deserialize)]
struct ApiListingData {
    #[serde(default)]
    children: Vec<ApiChild>,
}

#[derive(Debug, Deserialize)]
struct ApiChild {
    kind: Option<String>,
    data: ApiPost,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    created_utc: Option<f64>,
    selftext: Option<String>,
    author: Option<String>,
    preview: Option<ApiPreview>,
}

#[derive(Debug, Deserialize)]
struct ApiPreview {
    #[serde(default)]
    images: Vec<ApiPreviewImage>,
}

#[derive(Debug, Deserialize)]
struct ApiPreviewImage {
    source: Option<ApiImageSource>,
}

#[derive(Debug, Deserialize)]
struct ApiImageSource {
    url: Option<String>,
}
