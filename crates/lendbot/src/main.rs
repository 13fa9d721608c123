use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use lendbot::cli::{describe_sessions, Cli, Commands, SessionAction};
use lendbot::{create_bot, schema, setup_bot_commands, HandlerDeps};
use lendcore::core::init_logger;
use lendcore::storage::{create_pool, get_connection};
use lendcore::Config;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;

/// Main entry point for the lab tool-lending bot
///
/// # Errors
/// Returns an error if initialization fails (configuration, logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = Config::from_env()?;
    init_logger(&config.log_file_path, config.log_level)?;

    match cli.command {
        None => run_bot(config, false).await,
        Some(Commands::Run { webhook }) => {
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(config, webhook).await
        }
        Some(Commands::Migrate) => {
            create_pool(&config.database_path)?;
            log::info!("Migrations applied to {}", config.database_path);
            Ok(())
        }
        Some(Commands::Session {
            action: SessionAction::Show { user_id },
        }) => {
            let pool = create_pool(&config.database_path)?;
            let conn = get_connection(&pool)?;
            print!("{}", describe_sessions(&conn, user_id)?);
            Ok(())
        }
    }
}

async fn run_bot(config: Config, use_webhook: bool) -> Result<()> {
    log::info!("Starting bot...");

    let db_pool = Arc::new(create_pool(&config.database_path)?);
    let bot = create_bot(&config)?;

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            log::info!("Logged in as @{}", me.username());
            me.user.username.clone()
        }
        Err(e) => {
            log::warn!("Failed to get bot info: {}. Commands addressed to other bots will not be filtered.", e);
            None
        }
    };

    if let Err(e) = setup_bot_commands(&bot, &config.default_lang).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    if config.staff_ids.is_empty() {
        log::warn!("STAFF_IDS is empty: nobody can manage tools or confirm requests");
    }

    let webhook = if use_webhook { config.webhook_url.clone() } else { None };
    if use_webhook && webhook.is_none() {
        log::warn!("--webhook given but WEBHOOK_URL is not set, falling back to long polling");
    }
    let port = config.webhook_port;

    let deps = HandlerDeps::new(db_pool, Arc::new(config), bot_username);
    let handler = schema(deps);

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .enable_ctrlc_handler()
        .build();

    match webhook {
        Some(url) => {
            log::info!("Starting bot in webhook mode at {} (port {})", url, port);
            let options = webhooks::Options::new(([0, 0, 0, 0], port).into(), url::Url::parse(&url)?);
            let listener = webhooks::axum(bot, options).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
                )
                .await;
        }
        None => {
            log::info!("📡 Starting bot in long polling mode");
            dispatcher.dispatch().await;
        }
    }

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
