use serenity::all::{Context, EventHandler, Interaction, Ready};
use serenity::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PublishOnReady;
use crate::framework::{Framework, PublishOutcome};
use crate::utils::discord;

/// Forwards gateway events to the command framework.
pub struct Handler {
    framework: Arc<Framework>,
    publish_on_ready: PublishOnReady,
}

impl Handler {
    pub fn new(framework: Arc<Framework>, publish_on_ready: PublishOnReady) -> Self {
        Self {
            framework,
            publish_on_ready,
        }
    }

    /// Publishes the command set if configured to do so once connected.
    pub async fn publish_if_configured(&self) -> Option<PublishOutcome> {
        let scope = self.publish_on_ready.scope()?;
        let outcome = self.framework.publisher.publish(scope).await;
        if outcome.is_published() {
            info!(%outcome, "Commands published on ready");
        } else {
            warn!(%outcome, "Commands were not published on ready");
        }
        Some(outcome)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );

        self.framework.loader.attach_all().await;
        self.publish_if_configured().await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(interaction) = discord::convert(ctx.http.clone(), interaction) else {
            debug!("Ignoring unroutable interaction");
            return;
        };
        self.framework.dispatcher.dispatch(interaction).await;
    }
}
