//! Wires settings, sessions, renderer and handlers together and runs the REPL.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dbot_core::{init_tracing, Bot, BotIdentity};
use dbot_telegram::{resolve_identity, run_repl, TelegramBotAdapter};
use gemini_client::{mask_token, GeminiClient, InstructionSource};
use handler_chain::HandlerChain;
use tracing::info;

use crate::config::BotConfig;
use crate::handlers::{ChatHandler, CommandHandler, LoggingHandler};
use crate::render::StreamRenderer;
use crate::sessions::{GeminiSessionFactory, SessionRegistry};
use crate::settings::BotSettings;

/// Builds the handler chain: logging → commands → chat.
pub fn build_chain(
    bot: Arc<dyn Bot>,
    identity: BotIdentity,
    sessions: Arc<SessionRegistry>,
    settings: Arc<BotSettings>,
    edit_interval: Duration,
) -> HandlerChain {
    let renderer = StreamRenderer::new(Arc::clone(&bot), edit_interval);
    HandlerChain::new()
        .add_handler(Arc::new(LoggingHandler))
        .add_handler(Arc::new(CommandHandler::new(
            Arc::clone(&bot),
            identity.clone(),
            Arc::clone(&sessions),
            settings,
        )))
        .add_handler(Arc::new(ChatHandler::new(bot, identity, sessions, renderer)))
}

/// Runs the bot until the process is stopped.
pub async fn run_bot(config: BotConfig) -> Result<()> {
    init_tracing(&config.log_file)?;
    info!(
        log_file = %config.log_file,
        env_file = %config.env_file,
        model = %config.gemini.model,
        vision_model = %config.gemini.vision_model,
        gemini_api_key = %mask_token(&config.gemini.api_key),
        edit_interval_ms = config.edit_interval.as_millis() as u64,
        "Starting gemini-bot"
    );

    let settings = Arc::new(BotSettings::load(&config.env_file)?);
    let instruction: Arc<dyn InstructionSource> = settings.clone();
    let factory = Arc::new(GeminiSessionFactory::new(
        GeminiClient::new(&config.gemini),
        config.gemini.model.clone(),
        config.gemini.vision_model.clone(),
        instruction,
    ));
    let sessions = Arc::new(SessionRegistry::new(factory));

    let teloxide_bot = config.telegram.build_bot()?;
    let identity = resolve_identity(&teloxide_bot).await?;
    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));

    let chain = build_chain(bot, identity, sessions, settings, config.edit_interval);
    info!("Bot started");
    run_repl(teloxide_bot, chain).await
}
