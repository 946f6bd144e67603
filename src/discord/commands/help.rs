use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category order in the help embed
const CATEGORY_ORDER: &[&str] = &["Feed Setup", "Browsing"];

fn category_emoji(category: &str) -> &'static str {
    match category {
        "Feed Setup" => "📡",
        "Browsing" => "🔎",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    description: Option<&'static str>,
    note: Option<&'static str>,
}

fn command_metadata(name: &str) -> CommandMetadata {
    match name {
        "addreddit" => CommandMetadata {
            category: "Feed Setup",
            priority: 100,
            description: Some("Start monitoring a subreddit. New feeds begin switched off."),
            note: Some("Admin only. `r/` prefix and capitals are ignored."),
        },
        "tochannel" => CommandMetadata {
            category: "Feed Setup",
            priority: 90,
            description: Some("Choose the channel a subreddit's new posts go to."),
            note: Some("Admin only."),
        },
        "reddit" => CommandMetadata {
            category: "Browsing",
            priority: 100,
            description: Some("Show a random recent post, or switch a feed on or off."),
            note: Some("`reddit <name> on|off` is admin only."),
        },
        "listreddit" => CommandMetadata {
            category: "Feed Setup",
            priority: 80,
            description: Some("List monitored subreddits with their status and channel."),
            note: None,
        },
        "removereddit" => CommandMetadata {
            category: "Feed Setup",
            priority: 70,
            description: Some("Stop monitoring a subreddit and forget what it posted."),
            note: Some("Admin only."),
        },
        _ => CommandMetadata {
            category: "Browsing",
            priority: 0,
            description: None,
            note: None,
        },
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = command_metadata(&command.name);
        let description = metadata
            .description
            .or(command.description.as_deref())
            .unwrap_or("No description provided.");

        let entry = help_entry(&command.name, description, metadata.note);
        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Subreddit Feed Commands")
        .description(
            "Set up a feed with `addreddit`, point it at a channel with `tochannel`, \
             then start it with `reddit <subreddit> on`.",
        )
        .color(serenity::Colour::from_rgb(255, 69, 0))
        .timestamp(serenity::Timestamp::now());

    if let Ok(user) = ctx.framework().bot_id.to_user(&ctx).await {
        embed = embed.thumbnail(user.face());
    }

    for category in sorted_categories(categories.keys().copied().collect()) {
        if let Some(entries) = categories.get_mut(category) {
            // Highest priority first, then by text
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", category_emoji(category), category);
            let formatted: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };
                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Feeds are checked every few minutes.",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn help_entry(name: &str, description: &str, note: Option<&str>) -> String {
    let mut entry = format!("• **/{}**: {}", name, description);
    if let Some(note) = note {
        entry.push_str(&format!("\n  ⤷ {}", note));
    }
    entry
}

/// Known categories in their fixed order, anything else alphabetically after.
fn sorted_categories(mut categories: Vec<&str>) -> Vec<&str> {
    categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|x| x == a).unwrap_or(usize::MAX);
        let pos_b = CATEGORY_ORDER.iter().position(|x| x == b).unwrap_or(usize::MAX);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });
    categories
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Embed field values cap at 1024; leave some room
        if !current_chunk.is_empty() && current_length + entry_len + 1 > 1000 {
            chunks.push(std::mem::take(&mut current_chunk));
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}
