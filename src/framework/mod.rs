//! Command framework: registration, publishing and dispatch of interactions.
//!
//! [`Framework::new`] wires the pieces the way the bot uses them: one
//! registry shared by the loader, the publisher and the dispatcher.

/// Built-in module owning the `sync` command.
mod builtin;
/// Command definitions and their platform validation rules.
pub mod definition;
/// Interaction routing.
pub mod dispatcher;
/// Platform-neutral interaction and reply tracking.
pub mod interaction;
/// Module discovery and reload.
pub mod loader;
/// Feature module contract.
pub mod module;
/// Publishing command sets to the platform.
pub mod publisher;
/// Known commands and their owners.
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

pub use definition::{CommandDefinition, CommandOption, OptionKind};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use interaction::{Interaction, InteractionData, InteractionKind, Reply, Responder};
pub use loader::{LoadReport, ModuleLoader};
pub use module::{
    CommandHandler, FeatureModule, ModuleContext, ModuleDescriptor, ModuleHandler, ModuleSource,
    SlashCommandExecutor,
};
pub use publisher::{CommandApi, PublishOutcome, PublishScope, Publisher};
pub use registry::{CommandRegistry, SharedRegistry};

/// The assembled command framework.
pub struct Framework {
    pub registry: SharedRegistry,
    pub publisher: Arc<Publisher>,
    pub loader: ModuleLoader,
    pub dispatcher: Dispatcher,
}

impl Framework {
    /// Builds the framework around a fresh registry. Modules are not loaded
    /// until [`ModuleLoader::load_all`] is called.
    pub fn new(api: Arc<dyn CommandApi>, sources: Vec<ModuleSource>, data_dir: PathBuf) -> Self {
        let registry = CommandRegistry::new().shared();
        let publisher = Arc::new(Publisher::new(registry.clone(), api));
        let ctx = ModuleContext {
            data_dir,
            registry: registry.clone(),
            publisher: publisher.clone(),
        };
        let loader = ModuleLoader::new(ctx, sources);
        let dispatcher = Dispatcher::new(registry.clone(), loader.modules());

        Self {
            registry,
            publisher,
            loader,
            dispatcher,
        }
    }
}
