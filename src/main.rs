use dotenv::dotenv;
use serenity::all::{ClientBuilder, GatewayIntents, Http};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use guildhall::Error;
use guildhall::commands;
use guildhall::config::Config;
use guildhall::events::Handler;
use guildhall::framework::Framework;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("guildhall=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;

    // Publishing needs the application id before the gateway hands it over.
    let http = Http::new(&config.discord_token);
    let application_id = match config.application_id {
        Some(id) => id,
        None => http.get_current_application_info().await?.id,
    };
    http.set_application_id(application_id);

    let framework = Framework::new(Arc::new(http), commands::sources(), config.data_dir.clone());
    let report = framework.loader.load_all().await;
    if !report.failed.is_empty() {
        error!(modules = ?report.failed, "Some modules failed to load");
    }
    info!(modules = ?report.loaded, "Modules ready");

    let intents = GatewayIntents::non_privileged();
    let handler = Handler::new(Arc::new(framework), config.publish_on_ready);

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .application_id(application_id)
        .event_handler(handler)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.map_err(Into::into)
}
