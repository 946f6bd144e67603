//! Turns a `FeedItem` into the pieces of a rich post.
//!
//! The Discord layer maps `PostDisplay` onto an embed; keeping the decisions
//! here (truncation, image pick, footer text) lets them be tested without
//! building any Discord types.

use chrono::{DateTime, Utc};

use super::feed_models::FeedItem;

/// Maximum number of body characters shown before truncating.
pub const BODY_PREVIEW_CHARS: usize = 200;

/// Discord rejects embed titles longer than this.
const MAX_TITLE_CHARS: usize = 256;

const IMAGE_HOSTS: &[&str] = &["i.redd.it", "i.imgur.com"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Everything needed to render one relayed post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDisplay {
    pub title: String,
    pub url: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub footer: String,
}

impl PostDisplay {
    pub fn from_item(item: &FeedItem) -> Self {
        Self {
            title: truncate_chars(&item.title, MAX_TITLE_CHARS),
            url: item.url.clone(),
            timestamp: item.created_at,
            description: item
                .body
                .as_deref()
                .filter(|body| !body.is_empty())
                .map(|body| truncate_with_ellipsis(body, BODY_PREVIEW_CHARS)),
            image_url: pick_image(item),
            footer: format!("Posted by u/{}", item.author),
        }
    }
}

/// Keep the first `limit` characters and append `...` if anything was cut.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Direct image links win, otherwise fall back to the platform preview.
fn pick_image(item: &FeedItem) -> Option<String> {
    if is_image_link(&item.url) {
        return Some(item.url.clone());
    }
    item.preview_image_url.clone()
}

fn is_image_link(url: &str) -> bool {
    let lowered = url.to_lowercase();
    let Some((host, path)) = split_host_and_path(&lowered) else {
        return false;
    };

    // Imgur serves .gifv as an HTML video page, which embeds cannot show
    if path.ends_with(".gifv") {
        return false;
    }

    IMAGE_HOSTS.contains(&host) || IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Host and path of an http(s) link, with any query or fragment dropped.
fn split_host_and_path(url: &str) -> Option<(&str, &str)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    match rest.find('/') {
        Some(slash) => Some((&rest[..slash], &rest[slash..])),
        None => Some((rest, "")),
    }
}
