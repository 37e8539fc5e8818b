//! Pushes the registry's command set to the platform.
//!
//! Both scopes use the bulk overwrite endpoints: the remote set becomes
//! exactly the registry snapshot, so publishing twice is harmless.

use async_trait::async_trait;
use serenity::http::{Http, HttpError};
use serenity::model::id::GuildId;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::definition::CommandDefinition;
use super::registry::SharedRegistry;
use crate::Error;

/// Remote command endpoints. Both calls replace the whole set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Returns the number of commands the platform acknowledged.
    async fn set_global_commands(&self, commands: &[CommandDefinition]) -> Result<usize, Error>;

    async fn set_guild_commands(
        &self,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> Result<usize, Error>;
}

#[async_trait]
impl CommandApi for Http {
    async fn set_global_commands(&self, commands: &[CommandDefinition]) -> Result<usize, Error> {
        let created = self.create_global_commands(&commands).await?;
        Ok(created.len())
    }

    async fn set_guild_commands(
        &self,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> Result<usize, Error> {
        let created = self.create_guild_commands(guild_id, &commands).await?;
        Ok(created.len())
    }
}

/// Where a command set is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishScope {
    Global,
    Guild(GuildId),
}

impl fmt::Display for PublishScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishScope::Global => write!(f, "global"),
            PublishScope::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// What a publish attempt did. Publishing never returns an error; callers
/// that care inspect this value instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { scope: PublishScope, count: usize },
    Skipped { scope: PublishScope },
    Failed { scope: PublishScope, reason: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Published { scope, count } => {
                write!(f, "Published {count} commands ({scope}).")
            }
            PublishOutcome::Skipped { scope } => {
                write!(f, "No commands registered, nothing published ({scope}).")
            }
            PublishOutcome::Failed { scope, .. } => {
                write!(f, "Publishing commands ({scope}) failed, see the logs.")
            }
        }
    }
}

pub struct Publisher {
    registry: SharedRegistry,
    api: Arc<dyn CommandApi>,
}

impl Publisher {
    pub fn new(registry: SharedRegistry, api: Arc<dyn CommandApi>) -> Self {
        Self { registry, api }
    }

    pub async fn publish_global(&self) -> PublishOutcome {
        self.publish(PublishScope::Global).await
    }

    pub async fn publish_to_guild(&self, guild_id: GuildId) -> PublishOutcome {
        self.publish(PublishScope::Guild(guild_id)).await
    }

    pub async fn publish(&self, scope: PublishScope) -> PublishOutcome {
        let commands = self.registry.read().await.all();

        if commands.is_empty() {
            warn!(%scope, "No commands registered, skipping publish");
            return PublishOutcome::Skipped { scope };
        }

        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        info!(%scope, count = commands.len(), commands = ?names, "Publishing commands");

        let result = match scope {
            PublishScope::Global => self.api.set_global_commands(&commands).await,
            PublishScope::Guild(guild_id) => self.api.set_guild_commands(guild_id, &commands).await,
        };

        match result {
            Ok(count) => {
                info!(%scope, count, "Published commands");
                PublishOutcome::Published { scope, count }
            }
            Err(e) => {
                log_publish_error(scope, e.as_ref());
                PublishOutcome::Failed {
                    scope,
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn log_publish_error(scope: PublishScope, e: &(dyn std::error::Error + 'static)) {
    error!(%scope, error = %e, "Failed to publish commands");

    if let Some(serenity::Error::Http(HttpError::UnsuccessfulRequest(response))) =
        e.downcast_ref::<serenity::Error>()
    {
        error!(
            %scope,
            status = %response.status_code,
            code = %response.error.code,
            message = %response.error.message,
            errors = ?response.error.errors,
            "Platform rejected the command set"
        );
    }

    let mut source = e.source();
    while let Some(cause) = source {
        error!(%scope, cause = %cause, "Caused by");
        source = cause.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::registry::{CommandRegistry, sync_command};
    use assert_matches::assert_matches;
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;

    fn registry_with(defs: Vec<CommandDefinition>) -> SharedRegistry {
        let mut registry = CommandRegistry::empty();
        if !defs.is_empty() {
            registry.register_batch("mod_a", defs).unwrap();
        }
        registry.shared()
    }

    #[tokio::test]
    async fn empty_registry_makes_no_remote_call() {
        let mut api = MockCommandApi::new();
        api.expect_set_global_commands().never();
        api.expect_set_guild_commands().never();

        let publisher = Publisher::new(registry_with(vec![]), Arc::new(api));

        assert_eq!(
            publisher.publish_global().await,
            PublishOutcome::Skipped {
                scope: PublishScope::Global
            }
        );
        assert_matches!(
            publisher.publish_to_guild(GuildId::new(7)).await,
            PublishOutcome::Skipped { .. }
        );
    }

    #[tokio::test]
    async fn sends_every_command_in_order() {
        let mut api = MockCommandApi::new();
        api.expect_set_global_commands()
            .withf(|commands| {
                commands.iter().map(|c| c.name.as_str()).collect::<Vec<_>>() == ["ping", "sync"]
            })
            .times(1)
            .returning(|commands| Ok(commands.len()));

        let registry = registry_with(vec![CommandDefinition::new("ping", "Pong")]);
        registry.write().await.register(sync_command());
        let publisher = Publisher::new(registry, Arc::new(api));

        assert_eq!(
            publisher.publish_global().await,
            PublishOutcome::Published {
                scope: PublishScope::Global,
                count: 2
            }
        );
    }

    #[tokio::test]
    async fn guild_scope_targets_that_guild() {
        let mut api = MockCommandApi::new();
        api.expect_set_global_commands().never();
        api.expect_set_guild_commands()
            .with(eq(GuildId::new(99)), always())
            .times(1)
            .returning(|_, commands| Ok(commands.len()));

        let publisher = Publisher::new(CommandRegistry::new().shared(), Arc::new(api));

        assert!(publisher.publish_to_guild(GuildId::new(99)).await.is_published());
    }

    #[tokio::test]
    async fn remote_failure_is_returned_not_raised() {
        let mut api = MockCommandApi::new();
        api.expect_set_global_commands()
            .times(1)
            .returning(|_| Err("401: Unauthorized".into()));

        let publisher = Publisher::new(CommandRegistry::new().shared(), Arc::new(api));

        assert_matches!(
            publisher.publish_global().await,
            PublishOutcome::Failed { reason, .. } if reason.contains("Unauthorized")
        );
    }
}
