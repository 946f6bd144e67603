use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use super::embeds::build_post_embed;
use crate::core::feeds::{FeedError, PostDisplay, PostSink};

/// Delivers relayed posts to guild channels over the Discord HTTP API.
pub struct ChannelPostSink {
    http: Arc<serenity::Http>,
}

impl ChannelPostSink {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PostSink for ChannelPostSink {
    async fn deliver(&self, channel_id: u64, post: &PostDisplay) -> Result<(), FeedError> {
        // ChannelId::new panics on zero
        if channel_id == 0 {
            return Err(FeedError::Dispatch("channel id 0 is not valid".to_string()));
        }

        serenity::ChannelId::new(channel_id)
            .send_message(
                self.http.as_ref(),
                serenity::CreateMessage::new().embed(build_post_embed(post)),
            )
            .await
            .map_err(|e| FeedError::Dispatch(format!("channel {channel_id}: {e}")))?;
        Ok(())
    }
}
