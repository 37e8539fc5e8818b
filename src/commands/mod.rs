//! This module aggregates the feature modules plugged into the framework.

use crate::framework::ModuleSource;

/// General purpose commands (ping, help).
pub mod general;

/// Support tickets (requires the `tickets` feature).
#[cfg(feature = "tickets")]
pub mod tickets;

/// Every module source known to the bot, in load order.
pub fn sources() -> Vec<ModuleSource> {
    #[allow(unused_mut)]
    let mut sources = vec![ModuleSource::new("general", general::build)];

    #[cfg(feature = "tickets")]
    sources.push(ModuleSource::new("tickets", tickets::build));

    sources
}
