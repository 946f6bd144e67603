// Core feed module - subreddit registry, polling and post formatting.
//
// NO Discord or HTTP dependencies here. The content platform and the chat
// platform are reached through the `FeedSource` and `PostSink` traits.

pub mod feed_models;
pub mod feed_poller;
pub mod feed_registry;
pub mod feed_service;
pub mod formatting;

pub use feed_models::{FeedError, FeedItem, FeedSummary};
pub use feed_poller::spawn_poller;
pub use feed_service::{FeedService, FeedSource, PostSink};
pub use formatting::PostDisplay;
