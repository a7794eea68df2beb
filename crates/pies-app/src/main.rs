use std::sync::Arc;
use std::time::Duration;

use pies_hex::application::order_service::OrderService;
use pies_hex::application::reminder::ReminderSweep;
use pies_hex::application::router::Router;
use pies_hex::config::Config;
use pies_hex::inbound::http::{HttpServer, HttpServerConfig};
use pies_hex::inbound::telegram::TelegramPoller;
use pies_repo::{build_repo, Repo};
use pies_telegram::BotClient;
use pies_types::domain::catalog::Catalog;
use tracing_subscriber::EnvFilter;

/// Server-side wait of one getUpdates call.
const POLL_TIMEOUT_SECS: u32 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for BOT_TOKEN / DATABASE_URL / OPERATOR_IDS when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.operator_ids.is_empty() {
        tracing::warn!("OPERATOR_IDS is empty, every message will be ignored");
    }

    let repo: Repo = build_repo(Some(&config.database_url)).await?;
    let service = Arc::new(OrderService::new(repo, Catalog::default()));

    let bot = BotClient::builder(&config.bot_token)?
        .with_api_url(&config.telegram_api_url)?
        .with_timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 10))
        .build()?;

    let router = Arc::new(Router::new(
        service.clone(),
        config.operator_ids.iter().copied(),
        config.dialogue_idle_timeout,
    ));

    let sweep = ReminderSweep::new(
        service,
        Arc::new(bot.clone()),
        config.operator_ids.clone(),
        config.reminder_window,
        config.reminder_interval,
    );
    tokio::spawn(sweep.run());

    let http = HttpServer::new(HttpServerConfig {
        port: config.server_port.clone(),
    });
    tokio::spawn(async move {
        if let Err(e) = http.run().await {
            tracing::error!(error = format!("{e:#}"), "health server stopped");
        }
    });

    let poller = TelegramPoller::new(bot, router, POLL_TIMEOUT_SECS);
    tokio::select! {
        res = poller.run() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
