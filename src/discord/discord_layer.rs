// Discord layer - commands and the glue that turns core output into messages.

use std::sync::Arc;

use crate::core::feeds::FeedService;
use crate::infra::reddit::RedditClient;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "feeds/mod.rs"]
pub mod feeds;

/// Shared state handed to every command.
pub struct Data {
    pub feeds: Arc<FeedService<RedditClient>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
