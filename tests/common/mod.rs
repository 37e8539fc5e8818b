//! Common test utilities, fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use guildhall::framework::{
    CommandApi, CommandDefinition, Framework, Interaction, InteractionData, InteractionKind,
    ModuleSource, Reply, Responder,
};
use guildhall::{CommandResult, Error};
use serenity::model::id::{GuildId, UserId};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

static INIT: Once = Once::new();

/// Initialize tracing once per test binary.
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

/// Records the crate's log events for the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    /// Starts capturing until the returned guard is dropped. Only events
    /// emitted on this thread are seen, so use a current-thread runtime.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Messages logged at `level`.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("guildhall") {
            return;
        }
        let mut message = MessageField::default();
        event.record(&mut message);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

pub const SAMPLE_GUILD_ID: u64 = 987654321;
pub const SAMPLE_USER_ID: u64 = 123456789;

/// A remote call captured by [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Global(serde_json::Value),
    Guild(GuildId, serde_json::Value),
}

/// Command API recording the serialized payload of every call.
#[derive(Clone, Default)]
pub struct RecordingApi {
    pub calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl RecordingApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandApi for RecordingApi {
    async fn set_global_commands(&self, commands: &[CommandDefinition]) -> Result<usize, Error> {
        let payload = serde_json::to_value(commands)?;
        self.calls.lock().unwrap().push(ApiCall::Global(payload));
        Ok(commands.len())
    }

    async fn set_guild_commands(
        &self,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> Result<usize, Error> {
        let payload = serde_json::to_value(commands)?;
        self.calls
            .lock()
            .unwrap()
            .push(ApiCall::Guild(guild_id, payload));
        Ok(commands.len())
    }
}

/// Something sent back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply(Reply),
    Defer(bool),
    Edit(String),
    FollowUp(Reply),
}

#[derive(Clone, Default)]
pub struct RecordingResponder {
    pub sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingResponder {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of the last message the user saw.
    pub fn last_text(&self) -> Option<String> {
        self.sent().into_iter().rev().find_map(|s| match s {
            Sent::Reply(r) | Sent::FollowUp(r) => Some(r.content),
            Sent::Edit(content) => Some(content),
            Sent::Defer(_) => None,
        })
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> CommandResult {
        self.sent.lock().unwrap().push(Sent::Reply(reply));
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> CommandResult {
        self.sent.lock().unwrap().push(Sent::Defer(ephemeral));
        Ok(())
    }

    async fn edit_reply(&self, content: String) -> CommandResult {
        self.sent.lock().unwrap().push(Sent::Edit(content));
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> CommandResult {
        self.sent.lock().unwrap().push(Sent::FollowUp(reply));
        Ok(())
    }
}

/// Builds an interaction in the sample guild together with its recorder.
pub fn interaction(kind: InteractionKind, route: &str) -> (InteractionData, RecordingResponder) {
    let mut data = InteractionData::new(kind, route, UserId::new(SAMPLE_USER_ID));
    data.guild_id = Some(GuildId::new(SAMPLE_GUILD_ID));
    data.user_name = "tester".to_string();
    (data, RecordingResponder::default())
}

pub fn into_interaction(data: InteractionData, responder: &RecordingResponder) -> Interaction {
    Interaction::new(data, Box::new(responder.clone()))
}

/// A framework over `sources` publishing into a [`RecordingApi`].
pub fn framework(sources: Vec<ModuleSource>, data_dir: &Path) -> (Framework, RecordingApi) {
    init();
    let api = RecordingApi::default();
    let framework = Framework::new(Arc::new(api.clone()), sources, data_dir.to_path_buf());
    (framework, api)
}
