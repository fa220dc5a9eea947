//! Wraps teloxide::Bot and implements [`dbot_core::Bot`]. Production code sends messages via Telegram; tests can substitute another Bot impl.

use async_trait::async_trait;
use dbot_core::{parse_message_id, Bot as CoreBot, BotError, Chat, ParseMode};
use teloxide::net::Download;
use teloxide::types::{
    ChatAction, ChatId, FileId, LinkPreviewOptions, MessageId, ParseMode as TgParseMode,
    ReplyParameters,
};
use teloxide::{prelude::*, ApiError, DownloadError, RequestError};

/// Thin wrapper around teloxide::Bot that implements dbot-core's Bot trait.
///
/// Rich-text messages are sent with link previews disabled.
#[derive(Clone)]
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

/// Maps a teloxide request failure onto the transport-agnostic [`BotError`] classes.
pub fn classify_request_error(e: RequestError) -> BotError {
    match e {
        RequestError::Api(ApiError::MessageNotModified) => BotError::NotModified,
        RequestError::Api(api) => BotError::BadRequest(api.to_string()),
        RequestError::Network(e) => BotError::Network(e.to_string()),
        RequestError::Io(e) => BotError::Network(e.to_string()),
        other => BotError::Other(other.to_string()),
    }
}

fn classify_download_error(e: DownloadError) -> BotError {
    match e {
        DownloadError::Network(e) => BotError::Network(e.to_string()),
        DownloadError::Io(e) => BotError::Other(e.to_string()),
    }
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn message_id(id: &str) -> Result<MessageId, BotError> {
    parse_message_id(id)
        .map(MessageId)
        .map_err(|e| BotError::Other(e.to_string()))
}

#[async_trait]
impl CoreBot for TelegramBotAdapter {
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<String, BotError> {
        let mut request = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .link_preview_options(no_link_preview());
        if parse_mode == ParseMode::Html {
            request = request.parse_mode(TgParseMode::Html);
        }
        let sent = request.await.map_err(classify_request_error)?;
        Ok(sent.id.to_string())
    }

    async fn reply_to(
        &self,
        chat: &Chat,
        reply_to_message_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<String, BotError> {
        let target = message_id(reply_to_message_id)?;
        let mut request = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .reply_parameters(ReplyParameters::new(target))
            .link_preview_options(no_link_preview());
        if parse_mode == ParseMode::Html {
            request = request.parse_mode(TgParseMode::Html);
        }
        let sent = request.await.map_err(classify_request_error)?;
        Ok(sent.id.to_string())
    }

    async fn edit_message(
        &self,
        chat: &Chat,
        message_id_str: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), BotError> {
        let id = message_id(message_id_str)?;
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat.id), id, text.to_string())
            .link_preview_options(no_link_preview());
        if parse_mode == ParseMode::Html {
            request = request.parse_mode(TgParseMode::Html);
        }
        request.await.map_err(classify_request_error)?;
        Ok(())
    }

    async fn send_typing(&self, chat: &Chat) -> Result<(), BotError> {
        self.bot
            .send_chat_action(ChatId(chat.id), ChatAction::Typing)
            .await
            .map_err(classify_request_error)?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, BotError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(classify_request_error)?;
        let mut buf: Vec<u8> = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(classify_download_error)?;
        Ok(buf)
    }
}
