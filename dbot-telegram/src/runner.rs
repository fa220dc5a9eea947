//! REPL runner: converts teloxide messages to core::Message and passes them to HandlerChain.

use crate::adapters::TelegramMessageWrapper;
use anyhow::{Context, Result};
use dbot_core::{BotIdentity, ToCoreMessage};
use handler_chain::HandlerChain;
use teloxide::prelude::*;
use tracing::{error, info, instrument};

/// Asks the platform who we are (`getMe`). The username is required for mention gating in groups.
pub async fn resolve_identity(bot: &teloxide::Bot) -> Result<BotIdentity> {
    let me = bot.get_me().await.context("getMe failed")?;
    let username = me
        .user
        .username
        .clone()
        .context("bot account has no username")?;
    info!(bot_id = me.user.id.0, username = %username, "Bot identity resolved");
    Ok(BotIdentity {
        id: me.user.id.0 as i64,
        username,
    })
}

/// Starts the REPL with the given teloxide Bot and HandlerChain.
/// Each message is converted to core::Message and passed to chain.handle in its own task, so a
/// long generation in one chat never blocks another.
#[instrument(skip(bot, handler_chain))]
pub async fn run_repl(bot: teloxide::Bot, handler_chain: HandlerChain) -> Result<()> {
    let chain = handler_chain;
    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let chain = chain.clone();

        async move {
            let core_msg = TelegramMessageWrapper(&msg).to_core();

            match msg.text() {
                Some(text) => {
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        message_content = %text,
                        "Received message"
                    );
                }
                None => {
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        message_type = ?core_msg.message_type,
                        "Received non-text message"
                    );
                }
            }

            tokio::spawn(async move {
                if let Err(e) = chain.handle(&core_msg).await {
                    error!(error = %e, user_id = core_msg.user.id, chat_id = core_msg.chat.id, "Handler chain failed");
                }
            });

            Ok(())
        }
    })
    .await;

    Ok(())
}
