//! Channel Pulse server.
//!
//! Runs the poll loop and the bot webhook side by side until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use channel_pulse::api::{self, AppState};
use channel_pulse::auth::TokenProvider;
use channel_pulse::config::Config;
use channel_pulse::data_sources::{
    GoogleApi, MetricsFetcher, YouTubeAnalyticsClient, YouTubeDataClient, YouTubeFetcher,
};
use channel_pulse::engine::Engine;
use channel_pulse::logging;
use channel_pulse::storage::Storage;
use channel_pulse::telegram::{NotificationSink, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _logging = logging::init(config.log_dir.as_deref())?;

    info!(
        channel_id = %config.channel_id,
        port = config.port,
        db_url = %config.database_url,
        "Starting Channel Pulse"
    );

    let storage = Storage::new(&config.database_url)
        .await
        .context("failed to open database")?;
    info!("Database initialized");

    let tokens = match TokenProvider::initialize(&config.token_file).await {
        Ok(tokens) => Arc::new(tokens),
        Err(e) => {
            error!(error = %e, "Failed to obtain API credentials");
            return Err(e.context("credential initialization failed"));
        }
    };

    let google = GoogleApi::new(tokens);
    let fetcher: Arc<dyn MetricsFetcher> = Arc::new(YouTubeFetcher::new(
        YouTubeDataClient::new(google.clone()),
        YouTubeAnalyticsClient::new(google),
    ));

    let telegram = TelegramClient::new(&config.bot_token);
    if let Some(url) = &config.webhook_url {
        if let Err(e) = telegram
            .set_webhook(url, config.webhook_secret.as_deref())
            .await
        {
            warn!(error = %e, "Failed to register webhook; updates must be routed manually");
        }
    }
    let notifier: Arc<dyn NotificationSink> = Arc::new(telegram);

    let chat = storage.load_chat_binding().await?;
    let (binding_tx, binding_rx) = watch::channel(chat);

    let mut engine = Engine::new(
        config.engine_config(),
        fetcher.clone(),
        notifier.clone(),
        storage.clone(),
        binding_rx,
    );
    let ctx = engine.initial_context().await;
    let poller = tokio::spawn(engine.run(ctx));

    let state = AppState {
        storage,
        fetcher,
        notifier,
        binding: Arc::new(binding_tx),
        channel_id: config.channel_id.clone(),
        webhook_secret: config.webhook_secret.clone(),
    };
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Webhook server is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.abort();
    info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
