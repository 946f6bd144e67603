// Feed domain models - pure data, no Discord or HTTP types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the feed registry, the content source or the dispatcher.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("r/{0} is already being monitored")]
    AlreadyExists(String),
    #[error("r/{0} is not being monitored")]
    NotFound(String),
    #[error("`{0}` is not a valid subreddit name")]
    InvalidName(String),
    #[error("Reddit API error: {0}")]
    Source(String),
    #[error("Failed to deliver post: {0}")]
    Dispatch(String),
}

/// One post as returned by the content platform, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub body: Option<String>,
    pub author: String,
    /// First preview image the platform generated for the link, if any.
    pub preview_image_url: Option<String>,
}

/// Read-only view of a registry entry used by `listreddit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub name: String,
    pub enabled: bool,
    pub channel_id: Option<u64>,
}
