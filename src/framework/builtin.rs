//! Built-in `core` module answering the `sync` command.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::interaction::Interaction;
use super::module::{
    FeatureModule, ModuleContext, ModuleDescriptor, ModuleHandler, SlashCommandExecutor,
};
use super::publisher::PublishScope;
use super::registry::{CORE_MODULE, SYNC_COMMAND};
use crate::{CommandResult, Error};

/// Owns the framework commands; they are registered by the registry itself,
/// so the descriptor carries no batch.
pub struct CoreModule;

#[async_trait]
impl FeatureModule for CoreModule {
    fn describe(&self) -> Result<ModuleDescriptor, Error> {
        let mut descriptor = ModuleDescriptor::named(CORE_MODULE);
        descriptor.commands.push(SYNC_COMMAND.to_string());
        Ok(descriptor)
    }

    fn handler(self: Arc<Self>) -> ModuleHandler {
        ModuleHandler::Executor(self)
    }
}

#[async_trait]
impl SlashCommandExecutor for CoreModule {
    async fn execute_slash_command(
        &self,
        interaction: &mut Interaction,
        ctx: &ModuleContext,
    ) -> CommandResult {
        let scope = match interaction.data.get_string("scope") {
            Some("guild") => {
                let guild_id = interaction
                    .data
                    .guild_id
                    .ok_or("Guild scope can only be used inside a guild")?;
                PublishScope::Guild(guild_id)
            }
            _ => PublishScope::Global,
        };

        info!(
            user = %interaction.data.user_name,
            %scope,
            "Command sync requested"
        );

        interaction.defer(true).await?;
        let outcome = ctx.publisher.publish(scope).await;
        interaction.edit_reply(outcome.to_string()).await
    }
}
