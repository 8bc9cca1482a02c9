use anyhow::Result;
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use orgreg::cli::{Cli, Commands};
use orgreg::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramGateway};
use orgreg::web_server::{create_webhook_router, start_web_server, webhook_path};
use orgreg_core::core::{init_logger, log_startup_configuration};
use orgreg_core::storage::{create_pool, SubscriberStore};
use orgreg_core::{config, Conversation};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the selected subcommand.
///
/// # Errors
/// Returns an error if initialization fails (missing token, logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command_or_default() {
        Commands::Run { webhook } => run_bot(webhook).await,
        Commands::Migrate => migrate(),
    }
}

/// Opens the database and brings the schema up to date.
fn open_store() -> Result<SubscriberStore> {
    let pool = create_pool(&config::DATABASE_PATH)
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
    let store = SubscriberStore::new(Arc::new(pool));
    store.ensure_schema()?;
    Ok(store)
}

fn migrate() -> Result<()> {
    let store = open_store()?;
    log::info!(
        "Database {} is up to date ({} subscriber(s))",
        config::DATABASE_PATH.as_str(),
        store.count()?
    );
    Ok(())
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    // Fail fast before touching the database or the network
    let token = config::bot_token()?;

    log::info!("Starting bot...");
    log_startup_configuration(use_webhook);

    let store = open_store()?;
    let bot = create_bot(&token)?;

    let me = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", me.username, me.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let conversation = Arc::new(Conversation::new(store, TelegramGateway::new(bot.clone())));

    if use_webhook {
        run_webhook(bot, &token, conversation).await
    } else {
        run_polling(bot, conversation).await
    }
}

async fn run_webhook(bot: Bot, token: &SecretString, conversation: Arc<Conversation<TelegramGateway>>) -> Result<()> {
    let path = webhook_path(token.expose_secret());

    if let Some(base) = config::WEBHOOK_URL.as_deref() {
        let url = url::Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;
        bot.set_webhook(url).await?;
        log::info!("Webhook registered at {}/<token>", base.trim_end_matches('/'));
    } else {
        log::warn!("WEBHOOK_URL is not set; assuming the webhook is registered externally");
    }

    let app = create_webhook_router(conversation, &path);
    start_web_server(*config::WEB_PORT, app)
        .await
        .map_err(|e| anyhow::anyhow!("Webhook server failed: {}", e))?;

    log::info!("Webhook server stopped");
    Ok(())
}

async fn run_polling(bot: Bot, conversation: Arc<Conversation<TelegramGateway>>) -> Result<()> {
    // getUpdates is refused while a webhook is registered
    if let Err(e) = bot.delete_webhook().await {
        log::warn!("Failed to delete webhook: {}", e);
    }

    log::info!("Starting bot in long polling mode");
    let handler = schema(HandlerDeps::new(conversation));
    let listener = Polling::builder(bot.clone()).build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
