// This is the entry point of the subreddit feed bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): feed registry, poller, formatting
// - `infra/` = Implementations of core traits (the Reddit API client)
// - `discord/` = Discord-specific adapters (commands, embeds, channel delivery)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Start the poller once the gateway is ready, stop it on Ctrl-C

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::BotConfig;
use crate::core::feeds::{spawn_poller, FeedService};
use crate::discord::feeds::ChannelPostSink;
use crate::discord::Data;
use crate::infra::reddit::RedditClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Every credential is required; bail out before touching the network
    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The feed service owns the registry. Commands and the poller share it
    // through an Arc.

    let reddit_client =
        RedditClient::new(config.reddit.clone()).context("Failed to create Reddit API client")?;
    let feed_service = Arc::new(FeedService::new(reddit_client));

    let data = Data {
        feeds: Arc::clone(&feed_service),
    };

    let shutdown = CancellationToken::new();
    let poll_interval = config.poll_interval;

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required for prefix commands
        | serenity::GatewayIntents::GUILDS;

    let poller_shutdown = shutdown.clone();
    // setup runs after Ready; the poller handle comes back out so main can wait on it
    let (poller_tx, mut poller_rx) = oneshot::channel();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::reddit::addreddit(),
                discord::commands::reddit::removereddit(),
                discord::commands::reddit::listreddit(),
                discord::commands::reddit::tochannel(),
                discord::commands::reddit::reddit(),
                discord::commands::help::help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("Logged in as {} ({})", ready.user.name, ready.user.id);

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                // The gateway is up, so the poller can start relaying
                let sink = ChannelPostSink::new(ctx.http.clone());
                let poller = spawn_poller(
                    Arc::clone(&data.feeds),
                    sink,
                    poll_interval,
                    poller_shutdown,
                );
                let _ = poller_tx.send(poller);

                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating Discord client")?;

    // Ctrl-C cancels the next poll and closes the gateway connection
    let shard_manager = client.shard_manager.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
            return;
        }

        tracing::info!("Shutting down");
        signal_shutdown.cancel();
        shard_manager.shutdown_all().await;
    });

    let result = client.start().await;

    // Let a poll pass that is already running finish before the runtime goes away
    shutdown.cancel();
    // Nothing to wait for if the gateway never reached Ready
    if let Ok(poller) = poller_rx.try_recv() {
        if let Err(err) = poller.await {
            tracing::error!("Subreddit poller task failed: {}", err);
        }
    }

    result.context("Error running bot")?;
    Ok(())
}
