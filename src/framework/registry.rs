//! The process-wide set of known commands and the modules that own them.

use serenity::model::Permissions;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::definition::{CommandDefinition, CommandOption, DefinitionError, OptionKind};

/// Id of the built-in module owning framework commands such as `sync`.
pub const CORE_MODULE: &str = "core";
/// Name of the built-in publishing command.
pub const SYNC_COMMAND: &str = "sync";

/// Registry shared between the loader, publisher and dispatcher.
pub type SharedRegistry = Arc<RwLock<CommandRegistry>>;

/// Reasons a module's command batch is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("module '{module}': {source}")]
    InvalidDefinition {
        module: String,
        #[source]
        source: DefinitionError,
    },

    #[error("module '{module}' declares '{name}' more than once")]
    DuplicateInBatch { module: String, name: String },

    #[error("module '{module}' declares '{name}', already owned by module '{owner}'")]
    OwnedElsewhere {
        module: String,
        name: String,
        owner: String,
    },
}

/// Result of a single registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Added,
    Replaced { previous_owner: String },
}

/// The commands a single module contributed, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleRecord {
    pub id: String,
    pub commands: Vec<CommandDefinition>,
}

impl ModuleRecord {
    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.name == name)
    }
}

/// Known commands keyed by name, plus per-module ownership records.
///
/// Every command in `commands` is listed in exactly one module record and
/// every record entry is present in `commands`.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDefinition>,
    by_module: HashMap<String, ModuleRecord>,
}

impl CommandRegistry {
    /// Creates a registry holding the built-in `sync` command.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(sync_command());
        registry
    }

    /// Creates a registry without any command.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Registers a framework command owned by the core module, replacing any
    /// command with the same name.
    pub fn register(&mut self, def: CommandDefinition) -> Registration {
        self.insert_owned(CORE_MODULE, def)
    }

    /// Replaces the command list of `module_id` with `defs`.
    ///
    /// The batch is checked as a whole first; on error nothing changes.
    pub fn register_batch(
        &mut self,
        module_id: &str,
        defs: Vec<CommandDefinition>,
    ) -> Result<(), RegistryError> {
        if let Err(e) = self.check_batch(module_id, &defs) {
            error!(module = module_id, error = %e, "Rejected command batch");
            return Err(e);
        }

        self.unregister_module(module_id);
        self.by_module
            .entry(module_id.to_string())
            .or_insert_with(|| ModuleRecord {
                id: module_id.to_string(),
                commands: Vec::new(),
            });
        for def in &defs {
            self.insert_owned(module_id, def.clone());
        }
        debug!(
            module = module_id,
            count = defs.len(),
            "Registered command batch"
        );
        Ok(())
    }

    /// Removes every command owned by `module_id` and forgets the module.
    /// Returns the number of commands removed.
    pub fn unregister_module(&mut self, module_id: &str) -> usize {
        let Some(record) = self.by_module.remove(module_id) else {
            return 0;
        };
        let names: HashSet<&str> = record.commands.iter().map(|c| c.name.as_str()).collect();
        let before = self.commands.len();
        self.commands.retain(|c| !names.contains(c.name.as_str()));
        let removed = before - self.commands.len();
        debug!(module = module_id, removed, "Unregistered module commands");
        removed
    }

    pub fn find(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Snapshot of every command in registration order.
    pub fn all(&self) -> Vec<CommandDefinition> {
        self.commands.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name.clone()).collect()
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleRecord> {
        self.by_module.get(module_id)
    }

    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.by_module
            .values()
            .find(|record| record.contains(name))
            .map(|record| record.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn check_batch(
        &self,
        module_id: &str,
        defs: &[CommandDefinition],
    ) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for def in defs {
            def.validate()
                .map_err(|source| RegistryError::InvalidDefinition {
                    module: module_id.to_string(),
                    source,
                })?;
            if !seen.insert(def.name.as_str()) {
                return Err(RegistryError::DuplicateInBatch {
                    module: module_id.to_string(),
                    name: def.name.clone(),
                });
            }
            if let Some(owner) = self.owner_of(&def.name).filter(|owner| *owner != module_id) {
                return Err(RegistryError::OwnedElsewhere {
                    module: module_id.to_string(),
                    name: def.name.clone(),
                    owner: owner.to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert_owned(&mut self, owner: &str, def: CommandDefinition) -> Registration {
        let mut outcome = Registration::Added;

        if let Some(previous) = self.owner_of(&def.name).map(str::to_string) {
            warn!(
                command = %def.name,
                previous_owner = %previous,
                owner,
                "Overwriting existing command"
            );
            if let Some(record) = self.by_module.get_mut(&previous) {
                record.commands.retain(|c| c.name != def.name);
            }
            outcome = Registration::Replaced {
                previous_owner: previous,
            };
        }

        match self.commands.iter_mut().find(|c| c.name == def.name) {
            Some(slot) => *slot = def.clone(),
            None => self.commands.push(def.clone()),
        }

        self.by_module
            .entry(owner.to_string())
            .or_insert_with(|| ModuleRecord {
                id: owner.to_string(),
                commands: Vec::new(),
            })
            .commands
            .push(def);

        outcome
    }
}

/// The built-in command letting operators publish the command set.
pub fn sync_command() -> CommandDefinition {
    CommandDefinition::new(SYNC_COMMAND, "Publish the bot's commands to Discord")
        .option(
            CommandOption::new(OptionKind::String, "scope", "Where to publish the commands")
                .required(true)
                .choice("Global (every guild)", "global")
                .choice("This guild only", "guild"),
        )
        .default_member_permissions(Permissions::ADMINISTRATOR)
}
