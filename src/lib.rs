//! Guildhall: a community-management bot for Discord guilds.
//!
//! The crate is split into the command framework (registration, publishing
//! and dispatch of interactions) and the feature modules plugged into it.

/// Feature modules contributing commands and interaction handlers.
pub mod commands;
/// Environment-driven runtime configuration.
pub mod config;
/// Serenity event handler wiring the gateway to the framework.
pub mod events;
/// Command registry, module loader, publisher and dispatcher.
pub mod framework;
/// Shared utilities (JSON storage, serenity adapters).
pub mod utils;

/// Error type returned by interaction handlers.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
/// Result of a handler that only reports success or failure.
pub type CommandResult = Result<(), Error>;
