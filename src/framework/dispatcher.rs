//! Routes inbound interactions to the module that owns them.

use std::sync::Arc;
use tracing::{debug, error, warn};

use super::interaction::{Interaction, Reply, ReplyState};
use super::loader::SharedModules;
use super::module::CommandHandler;
use super::registry::SharedRegistry;

/// Shown when no module claims an interaction.
pub const UNHANDLED_MESSAGE: &str = "No handler is available for this interaction.";
/// Shown when the owning module fails.
pub const ERROR_MESSAGE: &str = "There was an error while handling this interaction.";

/// Terminal state of a dispatched interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled { module: String },
    Unhandled,
    Errored { module: String },
}

pub struct Dispatcher {
    registry: SharedRegistry,
    modules: SharedModules,
}

impl Dispatcher {
    pub fn new(registry: SharedRegistry, modules: SharedModules) -> Self {
        Self { registry, modules }
    }

    /// Finds the first live module claiming `interaction`, in attach order.
    /// The handler is `None` when that module cannot handle commands.
    async fn lookup(
        &self,
        interaction: &Interaction,
    ) -> Option<(String, Option<Arc<dyn CommandHandler>>)> {
        let route = interaction.data.route.as_str();
        let component = interaction.data.kind.is_component();

        // Same lock order as the loader: registry first.
        let registry = self.registry.read().await;
        let modules = self.modules.read().await;

        modules
            .iter()
            .find(|live| {
                live.commands.iter().any(|c| c == route)
                    || registry.module(&live.id).is_some_and(|r| r.contains(route))
                    || (component && live.module.claims_component(route))
            })
            .map(|live| (live.id.clone(), live.handler.clone()))
    }

    /// Handles one interaction. Never retries and never propagates errors.
    pub async fn dispatch(&self, mut interaction: Interaction) -> DispatchOutcome {
        let route = interaction.data.route.clone();
        let kind = interaction.data.kind;

        let (module, handler) = match self.lookup(&interaction).await {
            Some((module, Some(handler))) => (module, handler),
            Some((module, None)) => {
                warn!(route = %route, module = %module, "Claiming module has no handler");
                reply_unhandled(&mut interaction).await;
                return DispatchOutcome::Unhandled;
            }
            None => {
                warn!(route = %route, ?kind, "No module handles interaction");
                reply_unhandled(&mut interaction).await;
                return DispatchOutcome::Unhandled;
            }
        };

        debug!(route = %route, ?kind, module = %module, "Dispatching interaction");

        match handler.handle_commands(&mut interaction).await {
            Ok(true) => DispatchOutcome::Handled { module },
            Ok(false) => {
                warn!(route = %route, module = %module, "Module declined interaction");
                reply_unhandled(&mut interaction).await;
                DispatchOutcome::Unhandled
            }
            Err(e) => {
                error!(route = %route, module = %module, error = %e, "Interaction handler failed");
                reply_error(&mut interaction).await;
                DispatchOutcome::Errored { module }
            }
        }
    }
}

async fn reply_unhandled(interaction: &mut Interaction) {
    if interaction.is_replied() || interaction.is_deferred() {
        return;
    }
    if let Err(e) = interaction.reply(Reply::ephemeral(UNHANDLED_MESSAGE)).await {
        error!(error = %e, "Failed to send fallback reply");
    }
}

async fn reply_error(interaction: &mut Interaction) {
    let result = match interaction.state() {
        ReplyState::Pending => interaction.reply(Reply::ephemeral(ERROR_MESSAGE)).await,
        ReplyState::Deferred => interaction.edit_reply(ERROR_MESSAGE).await,
        ReplyState::Replied => interaction.follow_up(Reply::ephemeral(ERROR_MESSAGE)).await,
    };
    if let Err(e) = result {
        error!(error = %e, "Failed to send error reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::framework::definition::CommandDefinition;
    use crate::framework::interaction::test_support::{Recorder, Sent, slash};
    use crate::framework::interaction::{InteractionData, InteractionKind};
    use crate::framework::loader::LiveModule;
    use crate::framework::module::{FeatureModule, ModuleDescriptor};
    use crate::framework::registry::CommandRegistry;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;
    use std::sync::Mutex;
    use tokio::sync::RwLock;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Reply,
        DeferThenFail,
        Fail,
        Decline,
    }

    struct Stub {
        behaviour: Behaviour,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl FeatureModule for Stub {
        fn describe(&self) -> Result<ModuleDescriptor, Error> {
            Ok(ModuleDescriptor::default())
        }

        fn claims_component(&self, custom_id: &str) -> bool {
            custom_id.starts_with("stub:")
        }
    }

    #[async_trait]
    impl CommandHandler for Stub {
        async fn handle_commands(&self, interaction: &mut Interaction) -> Result<bool, Error> {
            *self.calls.lock().unwrap() += 1;
            match self.behaviour {
                Behaviour::Reply => {
                    interaction.reply(Reply::new("ok")).await?;
                    Ok(true)
                }
                Behaviour::DeferThenFail => {
                    interaction.defer(false).await?;
                    Err("database unavailable".into())
                }
                Behaviour::Fail => Err("boom".into()),
                Behaviour::Decline => Ok(false),
            }
        }
    }

    fn live(id: &str, commands: &[&str], stub: Arc<Stub>) -> LiveModule {
        LiveModule {
            id: id.to_string(),
            source: Some("stub"),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            module: stub.clone(),
            handler: Some(stub),
        }
    }

    fn stub(behaviour: Behaviour) -> Arc<Stub> {
        Arc::new(Stub {
            behaviour,
            calls: Mutex::new(0),
        })
    }

    fn dispatcher(registry: CommandRegistry, modules: Vec<LiveModule>) -> Dispatcher {
        Dispatcher::new(registry.shared(), Arc::new(RwLock::new(modules)))
    }

    #[tokio::test]
    async fn unknown_command_gets_one_fallback_reply() {
        let d = dispatcher(CommandRegistry::empty(), vec![]);
        let (interaction, recorder) = slash("nope");

        assert_eq!(d.dispatch(interaction).await, DispatchOutcome::Unhandled);
        assert_eq!(
            recorder.sent(),
            vec![Sent::Reply(Reply::ephemeral(UNHANDLED_MESSAGE))]
        );
    }

    #[tokio::test]
    async fn routes_by_declared_command_name() {
        let a = stub(Behaviour::Reply);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &["ping"], a.clone())],
        );
        let (interaction, recorder) = slash("ping");

        assert_eq!(
            d.dispatch(interaction).await,
            DispatchOutcome::Handled {
                module: "mod_a".into()
            }
        );
        assert_eq!(*a.calls.lock().unwrap(), 1);
        assert_eq!(recorder.sent(), vec![Sent::Reply(Reply::new("ok"))]);
    }

    #[tokio::test]
    async fn routes_by_registry_record() {
        let mut registry = CommandRegistry::empty();
        registry
            .register_batch("mod_a", vec![CommandDefinition::new("ticket", "Tickets")])
            .unwrap();
        let a = stub(Behaviour::Reply);
        let d = dispatcher(registry, vec![live("mod_a", &[], a.clone())]);

        let (interaction, _) = slash("ticket");
        assert_matches!(d.dispatch(interaction).await, DispatchOutcome::Handled { .. });
    }

    #[tokio::test]
    async fn first_attached_module_wins() {
        let a = stub(Behaviour::Reply);
        let b = stub(Behaviour::Reply);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![
                live("mod_a", &["ping"], a.clone()),
                live("mod_b", &["ping"], b.clone()),
            ],
        );

        let (interaction, _) = slash("ping");
        d.dispatch(interaction).await;

        assert_eq!(*a.calls.lock().unwrap(), 1);
        assert_eq!(*b.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn first_claimant_without_handler_is_not_skipped() {
        let a = stub(Behaviour::Reply);
        let b = stub(Behaviour::Reply);
        let mut headless = live("mod_a", &["ping"], a.clone());
        headless.handler = None;
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![headless, live("mod_b", &["ping"], b.clone())],
        );
        let (interaction, recorder) = slash("ping");

        assert_eq!(d.dispatch(interaction).await, DispatchOutcome::Unhandled);
        assert_eq!(*b.calls.lock().unwrap(), 0);
        assert_eq!(
            recorder.sent(),
            vec![Sent::Reply(Reply::ephemeral(UNHANDLED_MESSAGE))]
        );
    }

    #[tokio::test]
    async fn failing_handler_gets_one_ephemeral_error() {
        let a = stub(Behaviour::Fail);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &["ping"], a.clone())],
        );
        let (interaction, recorder) = slash("ping");

        assert_eq!(
            d.dispatch(interaction).await,
            DispatchOutcome::Errored {
                module: "mod_a".into()
            }
        );
        assert_eq!(*a.calls.lock().unwrap(), 1);
        assert_eq!(
            recorder.sent(),
            vec![Sent::Reply(Reply::ephemeral(ERROR_MESSAGE))]
        );
    }

    #[tokio::test]
    async fn failure_after_defer_edits_instead() {
        let a = stub(Behaviour::DeferThenFail);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &["ping"], a)],
        );
        let (interaction, recorder) = slash("ping");

        d.dispatch(interaction).await;

        assert_eq!(
            recorder.sent(),
            vec![Sent::Defer(false), Sent::Edit(ERROR_MESSAGE.into())]
        );
    }

    #[tokio::test]
    async fn failing_error_reply_is_swallowed() {
        let a = stub(Behaviour::Fail);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &["ping"], a)],
        );
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let data = InteractionData::new(InteractionKind::SlashCommand, "ping", UserId::new(1));
        let interaction = Interaction::new(data, Box::new(recorder.clone()));

        assert_matches!(d.dispatch(interaction).await, DispatchOutcome::Errored { .. });
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn declined_interaction_falls_back_once() {
        let a = stub(Behaviour::Decline);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &["ping"], a)],
        );
        let (interaction, recorder) = slash("ping");

        assert_eq!(d.dispatch(interaction).await, DispatchOutcome::Unhandled);
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn components_route_by_custom_id_prefix() {
        let a = stub(Behaviour::Reply);
        let d = dispatcher(
            CommandRegistry::empty(),
            vec![live("mod_a", &[], a.clone())],
        );
        let recorder = Recorder::default();
        let data = InteractionData::new(InteractionKind::Button, "stub:close:3", UserId::new(1));

        let outcome = d
            .dispatch(Interaction::new(data, Box::new(recorder.clone())))
            .await;

        assert_matches!(outcome, DispatchOutcome::Handled { .. });
        // A slash command with the same text is not a component route.
        let (interaction, _) = slash("stub:close:3");
        assert_eq!(d.dispatch(interaction).await, DispatchOutcome::Unhandled);
    }
}
