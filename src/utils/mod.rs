//! This module aggregates various utility submodules used throughout the application.

/// Conversions between serenity interactions and the command framework.
pub mod discord;
/// JSON file persistence for feature module state.
pub mod json_store;
