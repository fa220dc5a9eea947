//! Bot abstraction for sending and editing messages.
//!
//! [`Bot`] is transport-agnostic; `dbot_telegram::TelegramBotAdapter` implements it via teloxide and
//! tests substitute recording doubles.

use crate::error::{BotError, DbotError, Result};
use crate::types::Chat;
use async_trait::async_trait;

/// How the platform should interpret outbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Text is shown verbatim.
    Plain,
    /// Text is Telegram-flavoured HTML (`<b>`, `<i>`, `<code>`, `<pre>`, `<a>`, ...).
    Html,
}

/// Abstraction for sending and editing messages. Implementations map to a transport (e.g. Telegram).
///
/// Message ids are transport-specific strings (Telegram numeric ids).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a message to the chat and returns its id.
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        parse_mode: ParseMode,
    ) -> std::result::Result<String, BotError>;

    /// Sends a message as a reply to `reply_to_message_id` and returns the new message id.
    async fn reply_to(
        &self,
        chat: &Chat,
        reply_to_message_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> std::result::Result<String, BotError>;

    /// Replaces the text of an already-sent message.
    async fn edit_message(
        &self,
        chat: &Chat,
        message_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> std::result::Result<(), BotError>;

    /// Shows the "typing..." indicator in the chat.
    async fn send_typing(&self, chat: &Chat) -> std::result::Result<(), BotError>;

    /// Downloads a file previously attached to a message.
    async fn download_file(&self, file_id: &str) -> std::result::Result<Vec<u8>, BotError>;
}

/// Parses a message id string into an i32. Used by edit and reply calls.
pub fn parse_message_id(s: &str) -> Result<i32> {
    s.parse().map_err(|_| {
        DbotError::Bot(BotError::Other(format!("Invalid message_id: {}", s)))
    })
}
