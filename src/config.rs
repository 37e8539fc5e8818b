//! Runtime configuration read from the environment (and `.env`).

use serenity::model::id::{ApplicationId, GuildId};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::framework::PublishScope;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Whether commands are published automatically once the bot is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOnReady {
    Off,
    Global,
    Guild(GuildId),
}

impl PublishOnReady {
    pub fn scope(self) -> Option<PublishScope> {
        match self {
            PublishOnReady::Off => None,
            PublishOnReady::Global => Some(PublishScope::Global),
            PublishOnReady::Guild(guild_id) => Some(PublishScope::Guild(guild_id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub application_id: Option<ApplicationId>,
    pub data_dir: PathBuf,
    pub publish_on_ready: PublishOnReady,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let application_id = lookup("APPLICATION_ID")
            .map(|v| parse_id("APPLICATION_ID", &v).map(ApplicationId::new))
            .transpose()?;

        let data_dir = lookup("GUILDHALL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let dev_guild = lookup("GUILDHALL_DEV_GUILD_ID")
            .map(|v| parse_id("GUILDHALL_DEV_GUILD_ID", &v).map(GuildId::new))
            .transpose()?;

        let publish_on_ready = match lookup("GUILDHALL_PUBLISH_ON_READY").as_deref() {
            None | Some("off") => PublishOnReady::Off,
            Some("global") => PublishOnReady::Global,
            Some("guild") => {
                let Some(guild_id) = dev_guild else {
                    return Err(ConfigError::Missing("GUILDHALL_DEV_GUILD_ID"));
                };
                PublishOnReady::Guild(guild_id)
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "GUILDHALL_PUBLISH_ON_READY",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            discord_token,
            application_id,
            data_dir,
            publish_on_ready,
        })
    }
}

fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
}
