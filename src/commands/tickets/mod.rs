//! Support tickets: members open a ticket with a topic, anyone in the guild
//! can close it with `/ticket close` or a `ticket_close:<id>` button.

pub mod store;

use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::framework::{
    CommandDefinition, CommandHandler, CommandOption, FeatureModule, Interaction, ModuleContext,
    ModuleDescriptor, ModuleHandler, OptionKind, Reply,
};
use crate::utils::json_store::JsonStore;
use crate::{CommandResult, Error};

use store::{TicketBook, TicketError};

/// Custom id prefix of the close button.
pub const CLOSE_BUTTON_PREFIX: &str = "ticket_close:";
/// File name of the ticket store inside the data directory.
pub const STORE_FILE: &str = "tickets.json";

pub struct Tickets {
    store: OnceLock<JsonStore<TicketBook>>,
}

pub fn build() -> Result<Arc<dyn FeatureModule>, Error> {
    Ok(Arc::new(Tickets {
        store: OnceLock::new(),
    }))
}

fn ticket_command() -> CommandDefinition {
    let topic = CommandOption::new(OptionKind::String, "topic", "What do you need help with?");
    let id = CommandOption::new(
        OptionKind::Integer,
        "id",
        "Ticket number (defaults to your latest open ticket)",
    );

    let open = CommandOption::new(OptionKind::SubCommand, "open", "Open a new ticket")
        .sub_option(topic.required(true));
    let close = CommandOption::new(OptionKind::SubCommand, "close", "Close a ticket")
        .sub_option(id);
    let list = CommandOption::new(
        OptionKind::SubCommand,
        "list",
        "List the open tickets of this server",
    );

    CommandDefinition::new("ticket", "Open, close or list support tickets")
        .option(open)
        .option(close)
        .option(list)
}

#[async_trait]
impl FeatureModule for Tickets {
    fn describe(&self) -> Result<ModuleDescriptor, Error> {
        let descriptor = ModuleDescriptor::named("tickets");
        Ok(descriptor.with_slash_commands(vec![ticket_command()]))
    }

    async fn attach(&self, ctx: &ModuleContext) -> CommandResult {
        let path = ctx.data_dir.join(STORE_FILE);
        info!(path = %path.display(), "Ticket store attached");
        let _ = self.store.set(JsonStore::new(path));
        Ok(())
    }

    fn claims_component(&self, custom_id: &str) -> bool {
        custom_id.starts_with(CLOSE_BUTTON_PREFIX)
    }

    fn handler(self: Arc<Self>) -> ModuleHandler {
        ModuleHandler::Commands(self)
    }
}

#[async_trait]
impl CommandHandler for Tickets {
    async fn handle_commands(&self, interaction: &mut Interaction) -> Result<bool, Error> {
        let store = self.store.get().ok_or("Ticket store is not attached")?;

        let Some(guild_id) = interaction.data.guild_id.map(|g| g.get()) else {
            interaction
                .reply(Reply::ephemeral("Tickets can only be used inside a server."))
                .await?;
            return Ok(true);
        };
        let user_id = interaction.data.user_id.get();
        let user_name = interaction.data.user_name.clone();

        if let Some(custom_id) = interaction.data.custom_id().map(str::to_string) {
            let Some(id) = custom_id
                .strip_prefix(CLOSE_BUTTON_PREFIX)
                .and_then(|id| id.parse::<u64>().ok())
            else {
                warn!(%custom_id, "Malformed ticket button");
                return Ok(false);
            };
            let result = store
                .update(|book| book.close(guild_id, Some(id), user_id, Utc::now()))
                .await?;
            return answer_close(interaction, result, &user_name).await;
        }

        match interaction.data.subcommand.clone().as_deref() {
            Some("open") => {
                let topic = interaction
                    .data
                    .get_string("topic")
                    .ok_or("Missing topic")?
                    .to_string();
                let result = store
                    .update(|book| book.open(guild_id, user_id, &user_name, &topic, Utc::now()))
                    .await?;
                match result {
                    Ok(ticket) => {
                        let (id, topic) = (ticket.id, ticket.topic);
                        info!(
                            ticket = id,
                            guild = guild_id,
                            user = %user_name,
                            "Ticket opened"
                        );
                        let text = format!(
                            "Ticket #{id} opened by {user_name}: {topic}\nClose it with `/ticket close id:{id}`."
                        );
                        interaction.reply(Reply::new(text)).await?;
                    }
                    Err(e) => interaction.reply(Reply::ephemeral(e.to_string())).await?,
                }
                Ok(true)
            }
            Some("close") => {
                let id = interaction
                    .data
                    .get_integer("id")
                    .and_then(|id| u64::try_from(id).ok());
                let result = store
                    .update(|book| book.close(guild_id, id, user_id, Utc::now()))
                    .await?;
                answer_close(interaction, result, &user_name).await
            }
            Some("list") => {
                let book = store.load().await?;
                let mut text = String::new();
                for ticket in book.open_in(guild_id) {
                    let opened = ticket.opened_at.format("%Y-%m-%d %H:%M UTC");
                    let (id, topic, by) = (ticket.id, &ticket.topic, &ticket.opener_name);
                    let _ = writeln!(text, "#{id} {topic} (by {by}, {opened})");
                }
                if text.is_empty() {
                    text.push_str("There are no open tickets.");
                }
                interaction.reply(Reply::ephemeral(text)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

async fn answer_close(
    interaction: &mut Interaction,
    result: Result<store::Ticket, TicketError>,
    user_name: &str,
) -> Result<bool, Error> {
    match result {
        Ok(ticket) => {
            info!(ticket = ticket.id, user = %user_name, "Ticket closed");
            let text = format!("Ticket #{} closed by {user_name}.", ticket.id);
            interaction.reply(Reply::new(text)).await?;
        }
        Err(e) => interaction.reply(Reply::ephemeral(e.to_string())).await?,
    }
    Ok(true)
}
