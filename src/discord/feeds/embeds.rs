use crate::core::feeds::PostDisplay;
use poise::serenity_prelude as serenity;

/// Reddit orange-red.
const REDDIT_COLOR: u32 = 0xFF4500;

/// Turn a formatted post into a Discord embed.
pub fn build_post_embed(post: &PostDisplay) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&post.title)
        .url(&post.url)
        .color(REDDIT_COLOR)
        .footer(serenity::CreateEmbedFooter::new(&post.footer));

    if let Some(timestamp) = post
        .timestamp
        .and_then(|dt| serenity::Timestamp::from_unix_timestamp(dt.timestamp()).ok())
    {
        embed = embed.timestamp(timestamp);
    }
    if let Some(description) = &post.description {
        embed = embed.description(description);
    }
    if let Some(image_url) = &post.image_url {
        embed = embed.image(image_url);
    }

    embed
}
