//! Feature module contract.
//!
//! A module is described first (static metadata, no live client needed) and
//! attached later, once the bot is connected. Interaction handling goes
//! through [`CommandHandler`]; modules written against the older
//! [`SlashCommandExecutor`] shape are adapted when they are loaded.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::definition::CommandDefinition;
use super::interaction::Interaction;
use super::publisher::Publisher;
use super::registry::SharedRegistry;
use crate::{CommandResult, Error};

/// Static metadata returned by [`FeatureModule::describe`].
#[derive(Debug, Clone, Default)]
pub struct ModuleDescriptor {
    /// Declared module name; the source id is used when absent.
    pub name: Option<String>,
    /// Command names the module answers to (informational, also used for routing).
    pub commands: Vec<String>,
    /// Slash commands to register with the platform.
    pub slash_commands: Option<Vec<CommandDefinition>>,
}

impl ModuleDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Declares slash commands; their names are added to `commands`.
    pub fn with_slash_commands(mut self, defs: Vec<CommandDefinition>) -> Self {
        self.commands.extend(defs.iter().map(|d| d.name.clone()));
        self.slash_commands = Some(defs);
        self
    }
}

/// Services handed to modules when they attach or execute.
#[derive(Clone)]
pub struct ModuleContext {
    pub data_dir: PathBuf,
    pub registry: SharedRegistry,
    pub publisher: Arc<Publisher>,
}

/// Handles interactions routed to a module.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Returns whether the interaction was fully handled.
    async fn handle_commands(&self, interaction: &mut Interaction) -> Result<bool, Error>;
}

/// Alternate handler shape receiving the module context on every call.
#[async_trait]
pub trait SlashCommandExecutor: Send + Sync {
    async fn execute_slash_command(
        &self,
        interaction: &mut Interaction,
        ctx: &ModuleContext,
    ) -> CommandResult;
}

/// The handler capability a module exposes.
pub enum ModuleHandler {
    Commands(Arc<dyn CommandHandler>),
    Executor(Arc<dyn SlashCommandExecutor>),
    None,
}

impl ModuleHandler {
    /// Collapses the capability into a single [`CommandHandler`].
    pub fn resolve(self, ctx: &ModuleContext) -> Option<Arc<dyn CommandHandler>> {
        match self {
            ModuleHandler::Commands(handler) => Some(handler),
            ModuleHandler::Executor(executor) => Some(Arc::new(ExecutorAdapter {
                executor,
                ctx: ctx.clone(),
            })),
            ModuleHandler::None => None,
        }
    }
}

/// Runs a [`SlashCommandExecutor`] as a [`CommandHandler`]; a call that
/// returns without error counts as handled.
struct ExecutorAdapter {
    executor: Arc<dyn SlashCommandExecutor>,
    ctx: ModuleContext,
}

#[async_trait]
impl CommandHandler for ExecutorAdapter {
    async fn handle_commands(&self, interaction: &mut Interaction) -> Result<bool, Error> {
        self.executor
            .execute_slash_command(interaction, &self.ctx)
            .await?;
        Ok(true)
    }
}

/// A self-contained feature unit.
#[async_trait]
pub trait FeatureModule: Send + Sync {
    fn describe(&self) -> Result<ModuleDescriptor, Error>;

    /// Wires the module to the running bot.
    async fn attach(&self, _ctx: &ModuleContext) -> CommandResult {
        Ok(())
    }

    /// Whether a component or modal custom id belongs to this module.
    fn claims_component(&self, _custom_id: &str) -> bool {
        false
    }

    fn handler(self: Arc<Self>) -> ModuleHandler {
        ModuleHandler::None
    }
}

/// Constructor producing a fresh module instance.
pub type ModuleFactory = fn() -> Result<Arc<dyn FeatureModule>, Error>;

/// A discoverable module: its source id and how to build it.
#[derive(Clone, Copy)]
pub struct ModuleSource {
    pub id: &'static str,
    pub factory: ModuleFactory,
}

impl ModuleSource {
    pub const fn new(id: &'static str, factory: ModuleFactory) -> Self {
        Self { id, factory }
    }
}

impl std::fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSource").field("id", &self.id).finish()
    }
}
