//! `/ping` and `/help`.

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::debug;

use crate::framework::{
    CommandDefinition, CommandHandler, FeatureModule, Interaction, ModuleContext, ModuleDescriptor,
    ModuleHandler, Reply, SharedRegistry,
};
use crate::{CommandResult, Error};

pub struct General {
    registry: OnceLock<SharedRegistry>,
}

pub fn build() -> Result<Arc<dyn FeatureModule>, Error> {
    Ok(Arc::new(General {
        registry: OnceLock::new(),
    }))
}

#[async_trait]
impl FeatureModule for General {
    fn describe(&self) -> Result<ModuleDescriptor, Error> {
        let descriptor = ModuleDescriptor::named("general");
        Ok(descriptor.with_slash_commands(vec![
            CommandDefinition::new("ping", "Check that the bot is responsive"),
            CommandDefinition::new("help", "List the available commands"),
        ]))
    }

    async fn attach(&self, ctx: &ModuleContext) -> CommandResult {
        // Ignore a second attach after reload; the registry never changes.
        let _ = self.registry.set(ctx.registry.clone());
        Ok(())
    }

    fn handler(self: Arc<Self>) -> ModuleHandler {
        ModuleHandler::Commands(self)
    }
}

#[async_trait]
impl CommandHandler for General {
    async fn handle_commands(&self, interaction: &mut Interaction) -> Result<bool, Error> {
        let route = interaction.data.route.clone();
        match route.as_str() {
            "ping" => {
                let started = Instant::now();
                interaction.defer(false).await?;
                let latency = started.elapsed().as_millis() as u64;
                debug!(latency, "Ping acknowledged");
                let pong = format!("Pong! ({latency} ms)");
                interaction.edit_reply(pong).await?;
                Ok(true)
            }
            "help" => {
                let Some(registry) = self.registry.get() else {
                    return Err("help is unavailable until the bot is ready".into());
                };
                let listing = help_text(&registry.read().await.all());
                interaction.reply(Reply::ephemeral(listing)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn help_text(commands: &[CommandDefinition]) -> String {
    let mut text = String::from("**Available commands**\n");
    for command in commands {
        let _ = writeln!(text, "`/{}`: {}", command.name, command.description);
    }
    text
}
