// Process configuration, read from the environment (and `.env` via dotenv).
//
// Missing credentials are fatal: the bot refuses to start rather than
// running half-configured.

use std::time::Duration;

use thiserror::Error;

use crate::infra::reddit::RedditCredentials;

/// Two minutes between polls unless POLL_INTERVAL_SECS says otherwise.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;
const DEFAULT_COMMAND_PREFIX: &str = "^";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable! Add it to your .env file.")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub reddit: RedditCredentials,
    pub poll_interval: Duration,
    pub command_prefix: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let discord_token = require("DISCORD_TOKEN")?;
        let reddit = RedditCredentials {
            client_id: require("REDDIT_CLIENT_ID")?,
            client_secret: require("REDDIT_CLIENT_SECRET")?,
            user_agent: require("REDDIT_USER_AGENT")?,
        };

        let poll_interval_secs = match get("POLL_INTERVAL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "POLL_INTERVAL_SECS",
                        reason: format!("expected a positive number of seconds, got `{raw}`"),
                    })
                }
            },
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            discord_token,
            reddit,
            poll_interval: Duration::from_secs(poll_interval_secs),
            command_prefix: get("COMMAND_PREFIX")
                .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
        })
    }
}
