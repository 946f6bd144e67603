// Reddit infra layer.
// - `reddit_client.rs` talks to the Reddit OAuth API and implements `FeedSource`.

#[path = "reddit_client.rs"]
pub mod reddit_client;

pub use reddit_client::{RedditClient, RedditCredentials};
