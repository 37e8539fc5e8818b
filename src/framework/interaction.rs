//! Platform-neutral view of an inbound interaction and its reply channel.
//!
//! The [`Interaction`] wrapper tracks whether the interaction has already
//! been acknowledged, so a second reply is refused locally instead of
//! reaching the platform as an error.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::collections::HashMap;
use thiserror::Error;

use crate::{CommandResult, Error};

/// Which kind of user action produced the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    SlashCommand,
    Button,
    SelectMenu,
    ModalSubmit,
}

impl InteractionKind {
    /// Components and modals are routed by custom id rather than command name.
    pub fn is_component(self) -> bool {
        !matches!(self, InteractionKind::SlashCommand)
    }
}

/// A resolved option value supplied with a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// User, channel, role, mentionable or attachment id.
    Snowflake(u64),
}

/// Everything a handler can read about an interaction.
#[derive(Debug, Clone)]
pub struct InteractionData {
    pub kind: InteractionKind,
    /// Command name for slash commands, custom id otherwise.
    pub route: String,
    pub subcommand: Option<String>,
    pub options: HashMap<String, OptionValue>,
    /// Selected values for select menus.
    pub values: Vec<String>,
    /// Submitted text fields for modals, keyed by input custom id.
    pub fields: HashMap<String, String>,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
    pub user_name: String,
}

impl InteractionData {
    pub fn new(kind: InteractionKind, route: impl Into<String>, user_id: UserId) -> Self {
        Self {
            kind,
            route: route.into(),
            subcommand: None,
            options: HashMap::new(),
            values: Vec::new(),
            fields: HashMap::new(),
            guild_id: None,
            channel_id: None,
            user_id,
            user_name: String::new(),
        }
    }

    pub fn command_name(&self) -> Option<&str> {
        (!self.kind.is_component()).then_some(self.route.as_str())
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.kind.is_component().then_some(self.route.as_str())
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.options.get(name) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        match self.options.get(name) {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.options.get(name) {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Content of a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// A reply only the invoking user can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Transport used to answer an interaction.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, reply: Reply) -> CommandResult;
    async fn defer(&self, ephemeral: bool) -> CommandResult;
    async fn edit_reply(&self, content: String) -> CommandResult;
    async fn follow_up(&self, reply: Reply) -> CommandResult;
}

/// Acknowledgement state of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    Pending,
    Deferred,
    Replied,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    #[error("interaction was already acknowledged ({0:?})")]
    AlreadyAcknowledged(ReplyState),

    #[error("interaction has not been acknowledged yet")]
    NotAcknowledged,
}

/// An inbound interaction together with its reply capability.
pub struct Interaction {
    pub data: InteractionData,
    state: ReplyState,
    responder: Box<dyn Responder>,
}

impl Interaction {
    pub fn new(data: InteractionData, responder: Box<dyn Responder>) -> Self {
        Self {
            data,
            state: ReplyState::Pending,
            responder,
        }
    }

    pub fn state(&self) -> ReplyState {
        self.state
    }

    pub fn is_replied(&self) -> bool {
        self.state == ReplyState::Replied
    }

    pub fn is_deferred(&self) -> bool {
        self.state == ReplyState::Deferred
    }

    /// Sends the initial response.
    pub async fn reply(&mut self, reply: Reply) -> CommandResult {
        self.ensure_pending()?;
        self.responder.reply(reply).await?;
        self.state = ReplyState::Replied;
        Ok(())
    }

    /// Acknowledges now and promises an edit later.
    pub async fn defer(&mut self, ephemeral: bool) -> CommandResult {
        self.ensure_pending()?;
        self.responder.defer(ephemeral).await?;
        self.state = ReplyState::Deferred;
        Ok(())
    }

    /// Replaces the content of the original (or deferred) response.
    pub async fn edit_reply(&mut self, content: impl Into<String>) -> CommandResult {
        if self.state == ReplyState::Pending {
            return Err(ReplyError::NotAcknowledged.into());
        }
        self.responder.edit_reply(content.into()).await?;
        self.state = ReplyState::Replied;
        Ok(())
    }

    /// Sends an additional message after the interaction was acknowledged.
    pub async fn follow_up(&mut self, reply: Reply) -> CommandResult {
        if self.state == ReplyState::Pending {
            return Err(ReplyError::NotAcknowledged.into());
        }
        self.responder.follow_up(reply).await
    }

    /// Answers with `content`, editing the deferred response when needed.
    pub async fn respond(&mut self, content: impl Into<String>, ephemeral: bool) -> CommandResult {
        let content = content.into();
        match self.state {
            ReplyState::Pending => {
                let reply = Reply { content, ephemeral };
                self.reply(reply).await
            }
            ReplyState::Deferred => self.edit_reply(content).await,
            ReplyState::Replied => self.follow_up(Reply { content, ephemeral }).await,
        }
    }

    fn ensure_pending(&self) -> Result<(), Error> {
        match self.state {
            ReplyState::Pending => Ok(()),
            state => Err(ReplyError::AlreadyAcknowledged(state).into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn second_reply_is_refused_locally() {
        let (mut interaction, recorder) = slash("ping");

        interaction.reply(Reply::new("first")).await.unwrap();
        let err = interaction.reply(Reply::new("second")).await.unwrap_err();

        assert!(err.downcast_ref::<ReplyError>().is_some());
        assert_eq!(recorder.sent(), vec![Sent::Reply(Reply::new("first"))]);
    }

    #[tokio::test]
    async fn respond_edits_after_defer() {
        let (mut interaction, recorder) = slash("ping");

        interaction.defer(true).await.unwrap();
        interaction.respond("done", true).await.unwrap();

        assert!(interaction.is_replied());
        assert_eq!(
            recorder.sent(),
            vec![Sent::Defer(true), Sent::Edit("done".into())]
        );
    }

    #[tokio::test]
    async fn failed_reply_keeps_pending_state() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let data = InteractionData::new(InteractionKind::Button, "x", UserId::new(1));
        let mut interaction = Interaction::new(data, Box::new(recorder));

        assert!(interaction.reply(Reply::new("hi")).await.is_err());
        assert_eq!(interaction.state(), ReplyState::Pending);
    }

    #[test]
    fn routes_by_kind() {
        let data = InteractionData::new(InteractionKind::SelectMenu, "party:join", UserId::new(1));
        assert_eq!(data.custom_id(), Some("party:join"));
        assert_eq!(data.command_name(), None);
    }
}
