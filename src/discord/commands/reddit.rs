// Discord commands for the subreddit feed.
//
// Same pattern as every other command file: pull primitives out of the
// Discord types, call the core service, turn the result into a reply.
// User mistakes become plain replies; only Discord failures bubble up.

use crate::core::feeds::{FeedError, FeedSummary};
use crate::discord::feeds::build_post_embed;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Discord's per-message character limit.
const MESSAGE_LIMIT: usize = 2000;

/// Add a subreddit to the monitored list.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn addreddit(
    ctx: Context<'_>,
    #[description = "Subreddit name, with or without r/"] subreddit: String,
) -> Result<(), Error> {
    let reply = match ctx.data().feeds.add_feed(&subreddit).await {
        Ok(name) => {
            tracing::info!(feed = %name, user = %ctx.author().name, "Subreddit added");
            format!("Added r/{name} to the monitored list.")
        }
        Err(err) => user_message(&err),
    };

    ctx.say(reply).await?;
    Ok(())
}

/// Remove a subreddit from the monitored list.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn removereddit(
    ctx: Context<'_>,
    #[description = "Subreddit name, with or without r/"] subreddit: String,
) -> Result<(), Error> {
    let reply = match ctx.data().feeds.remove_feed(&subreddit).await {
        Ok(name) => {
            tracing::info!(feed = %name, user = %ctx.author().name, "Subreddit removed");
            format!("Removed r/{name} from the monitored list.")
        }
        Err(err) => user_message(&err),
    };

    ctx.say(reply).await?;
    Ok(())
}

/// List all monitored subreddits.
#[poise::command(prefix_command, slash_command)]
pub async fn listreddit(ctx: Context<'_>) -> Result<(), Error> {
    let feeds = ctx.data().feeds.list_feeds().await;
    if feeds.is_empty() {
        ctx.say("No subreddits are currently being monitored.").await?;
        return Ok(());
    }

    for chunk in render_feed_list(&feeds) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Set the channel for a subreddit's auto feed.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn tochannel(
    ctx: Context<'_>,
    #[description = "Channel that receives new posts"] channel: serenity::GuildChannel,
    #[description = "Subreddit name, with or without r/"] subreddit: String,
) -> Result<(), Error> {
    if !matches!(
        channel.kind,
        serenity::ChannelType::Text | serenity::ChannelType::News
    ) {
        ctx.say(format!("<#{}> is not a text channel.", channel.id))
            .await?;
        return Ok(());
    }

    let reply = match ctx
        .data()
        .feeds
        .set_destination(&subreddit, channel.id.get())
        .await
    {
        Ok(name) => format!("r/{name} auto feed channel set to <#{}>.", channel.id),
        Err(err) => user_message(&err),
    };

    ctx.say(reply).await?;
    Ok(())
}

/// Fetch a random recent post, or turn the auto feed on/off.
///
/// `reddit <subreddit>` posts one of the latest posts here.
/// `reddit <subreddit> on|off` toggles the auto feed (administrators only).
#[poise::command(prefix_command, slash_command)]
pub async fn reddit(
    ctx: Context<'_>,
    #[description = "Subreddit name, with or without r/"] subreddit: String,
    #[description = "`on` or `off` to toggle the auto feed"] toggle: Option<String>,
) -> Result<(), Error> {
    let feeds = &ctx.data().feeds;

    let name = match feeds.resolve(&subreddit).await {
        Ok(name) => name,
        Err(err) => {
            ctx.say(user_message(&err)).await?;
            return Ok(());
        }
    };

    if let Some(toggle) = toggle {
        let Some(enabled) = parse_toggle(&toggle) else {
            ctx.say("Invalid toggle. Use `reddit <subreddit> on` or `reddit <subreddit> off`.")
                .await?;
            return Ok(());
        };

        if !caller_is_admin(ctx).await {
            ctx.say("Only administrators can turn auto feeds on or off.")
                .await?;
            return Ok(());
        }

        let reply = match feeds.set_enabled(&name, enabled).await {
            Ok(name) => {
                tracing::info!(feed = %name, enabled, "Auto feed toggled");
                format!(
                    "Auto feed for r/{name} is now **{}**.",
                    if enabled { "ON" } else { "OFF" }
                )
            }
            Err(err) => user_message(&err),
        };
        ctx.say(reply).await?;
        return Ok(());
    }

    ctx.defer().await?;

    match feeds.fetch_random(&name).await {
        Ok(Some(post)) => {
            ctx.send(poise::CreateReply::default().embed(build_post_embed(&post)))
                .await?;
        }
        Ok(None) => {
            ctx.say(format!("No posts found in r/{name} at this time."))
                .await?;
        }
        Err(err) => {
            tracing::error!(feed = %name, error = %err, "Manual subreddit fetch failed");
            ctx.say(format!("Error fetching post from r/{name}: {err}"))
                .await?;
        }
    }

    Ok(())
}

/// Administrator check for the toggle path, which shares a command with the public fetch.
async fn caller_is_admin(ctx: Context<'_>) -> bool {
    let Some(member) = ctx.author_member().await else {
        return false;
    };

    // Interactions carry resolved permissions; prefix commands need the cached guild
    if let Some(permissions) = member.permissions {
        return permissions.administrator();
    }

    ctx.guild()
        .map(|guild| guild.member_permissions(&member).administrator())
        .unwrap_or(false)
}

fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn user_message(err: &FeedError) -> String {
    match err {
        FeedError::NotFound(name) => {
            format!("r/{name} is not being monitored. Add it using `addreddit`.")
        }
        other => format!("{other}."),
    }
}

/// One line per feed, packed into messages that fit Discord's limit.
fn render_feed_list(feeds: &[FeedSummary]) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for feed in feeds {
        let status = if feed.enabled { "ON" } else { "OFF" };
        let channel = feed
            .channel_id
            .map(|id| format!("<#{id}>"))
            .unwrap_or_else(|| "No channel set".to_string());
        let line = format!(
            "**r/{}** - Enabled: **{}**, Channel: {}",
            feed.name, status, channel
        );

        if !current.is_empty() && current.len() + 1 + line.len() > MESSAGE_LIMIT {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
