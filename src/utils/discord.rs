//! Adapters between serenity's interaction types and the framework.

use async_trait::async_trait;
use serenity::all::{
    ActionRowComponent, CommandDataOption, CommandDataOptionValue, CommandInteraction,
    ComponentInteraction, ComponentInteractionDataKind, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EditInteractionResponse,
    Http, Interaction as GatewayInteraction, ModalInteraction,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::CommandResult;
use crate::framework::interaction::{
    Interaction, InteractionData, InteractionKind, OptionValue, Reply, Responder,
};

enum Target {
    Command(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

/// Answers an interaction through the platform's HTTP API.
pub struct SerenityResponder {
    http: Arc<Http>,
    target: Target,
}

#[async_trait]
impl Responder for SerenityResponder {
    async fn reply(&self, reply: Reply) -> CommandResult {
        let message = CreateInteractionResponseMessage::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        self.create_response(CreateInteractionResponse::Message(message))
            .await
    }

    async fn defer(&self, ephemeral: bool) -> CommandResult {
        let message = CreateInteractionResponseMessage::new().ephemeral(ephemeral);
        self.create_response(CreateInteractionResponse::Defer(message))
            .await
    }

    async fn edit_reply(&self, content: String) -> CommandResult {
        let edit = EditInteractionResponse::new().content(content);
        match &self.target {
            Target::Command(i) => i.edit_response(&self.http, edit).await?,
            Target::Component(i) => i.edit_response(&self.http, edit).await?,
            Target::Modal(i) => i.edit_response(&self.http, edit).await?,
        };
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> CommandResult {
        let followup = CreateInteractionResponseFollowup::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        match &self.target {
            Target::Command(i) => i.create_followup(&self.http, followup).await?,
            Target::Component(i) => i.create_followup(&self.http, followup).await?,
            Target::Modal(i) => i.create_followup(&self.http, followup).await?,
        };
        Ok(())
    }
}

impl SerenityResponder {
    async fn create_response(&self, response: CreateInteractionResponse) -> CommandResult {
        match &self.target {
            Target::Command(i) => i.create_response(&self.http, response).await?,
            Target::Component(i) => i.create_response(&self.http, response).await?,
            Target::Modal(i) => i.create_response(&self.http, response).await?,
        }
        Ok(())
    }
}

/// Converts a gateway interaction into a routable [`Interaction`].
/// Pings and autocomplete requests are not routed and yield `None`.
pub fn convert(http: Arc<Http>, interaction: GatewayInteraction) -> Option<Interaction> {
    let (data, target) = match interaction {
        GatewayInteraction::Command(command) => (command_data(&command), Target::Command(command)),
        GatewayInteraction::Component(component) => {
            (component_data(&component), Target::Component(component))
        }
        GatewayInteraction::Modal(modal) => (modal_data(&modal), Target::Modal(modal)),
        _ => return None,
    };
    Some(Interaction::new(
        data,
        Box::new(SerenityResponder { http, target }),
    ))
}

fn command_data(command: &CommandInteraction) -> InteractionData {
    let mut data = InteractionData::new(
        InteractionKind::SlashCommand,
        command.data.name.clone(),
        command.user.id,
    );
    data.user_name = command.user.name.clone();
    data.guild_id = command.guild_id;
    data.channel_id = Some(command.channel_id);
    flatten_options(&command.data.options, &mut data);
    data
}

fn flatten_options(options: &[CommandDataOption], data: &mut InteractionData) {
    for option in options {
        let value = match &option.value {
            CommandDataOptionValue::SubCommand(nested)
            | CommandDataOptionValue::SubCommandGroup(nested) => {
                data.subcommand = Some(option.name.clone());
                flatten_options(nested, data);
                continue;
            }
            CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
            CommandDataOptionValue::Integer(i) => OptionValue::Integer(*i),
            CommandDataOptionValue::Number(n) => OptionValue::Number(*n),
            CommandDataOptionValue::Boolean(b) => OptionValue::Boolean(*b),
            CommandDataOptionValue::User(id) => OptionValue::Snowflake(id.get()),
            CommandDataOptionValue::Channel(id) => OptionValue::Snowflake(id.get()),
            CommandDataOptionValue::Role(id) => OptionValue::Snowflake(id.get()),
            CommandDataOptionValue::Mentionable(id) => OptionValue::Snowflake(id.get()),
            CommandDataOptionValue::Attachment(id) => OptionValue::Snowflake(id.get()),
            _ => continue,
        };
        data.options.insert(option.name.clone(), value);
    }
}

fn component_data(component: &ComponentInteraction) -> InteractionData {
    let (kind, values) = match &component.data.kind {
        ComponentInteractionDataKind::Button => (InteractionKind::Button, Vec::new()),
        ComponentInteractionDataKind::StringSelect { values } => {
            (InteractionKind::SelectMenu, values.clone())
        }
        _ => (InteractionKind::SelectMenu, Vec::new()),
    };
    let mut data = InteractionData::new(kind, component.data.custom_id.clone(), component.user.id);
    data.values = values;
    data.user_name = component.user.name.clone();
    data.guild_id = component.guild_id;
    data.channel_id = Some(component.channel_id);
    data
}

fn modal_data(modal: &ModalInteraction) -> InteractionData {
    let fields: HashMap<String, String> = modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((
                input.custom_id.clone(),
                input.value.clone().unwrap_or_default(),
            )),
            _ => None,
        })
        .collect();

    let mut data = InteractionData::new(
        InteractionKind::ModalSubmit,
        modal.data.custom_id.clone(),
        modal.user.id,
    );
    data.fields = fields;
    data.user_name = modal.user.name.clone();
    data.guild_id = modal.guild_id;
    data.channel_id = Some(modal.channel_id);
    data
}
