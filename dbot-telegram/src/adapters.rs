//! Adapters from Telegram (teloxide) types to dbot_core types.
//! Depends only on teloxide and dbot_core type definitions.

use dbot_core::{Chat, ChatKind, Message, MessageType, Photo, ToCoreMessage, ToCoreUser, User};

/// Wraps a teloxide User for conversion to core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            is_bot: self.0.is_bot,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

/// Wraps a teloxide Message for conversion to core [`Message`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> ToCoreMessage for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> Message {
        let photo = self.largest_photo();
        let message_type = if self.0.text().is_some() {
            MessageType::Text
        } else if photo.is_some() {
            MessageType::Photo
        } else {
            MessageType::Other
        };
        Message {
            id: self.0.id.to_string(),
            user: self
                .0
                .from
                .as_ref()
                .map(|u| TelegramUserWrapper(u).to_core())
                .unwrap_or_else(|| User {
                    id: 0,
                    is_bot: false,
                    username: None,
                    first_name: None,
                    last_name: None,
                }),
            chat: Chat {
                id: self.0.chat.id.0,
                kind: self.chat_kind(),
            },
            content: self
                .0
                .text()
                .or_else(|| self.0.caption())
                .unwrap_or("")
                .to_string(),
            message_type,
            photo,
            created_at: chrono::Utc::now(),
            reply_to_message_id: self.0.reply_to_message().map(|m| m.id.to_string()),
            reply_to_user: self
                .0
                .reply_to_message()
                .and_then(|m| m.from.as_ref())
                .map(|u| TelegramUserWrapper(u).to_core()),
        }
    }
}

impl<'a> TelegramMessageWrapper<'a> {
    fn chat_kind(&self) -> ChatKind {
        let chat = &self.0.chat;
        if chat.is_supergroup() {
            ChatKind::Supergroup
        } else if chat.is_group() {
            ChatKind::Group
        } else if chat.is_channel() {
            ChatKind::Channel
        } else {
            ChatKind::Private
        }
    }

    /// Telegram delivers every photo in several resolutions; keep the biggest one.
    fn largest_photo(&self) -> Option<Photo> {
        self.0
            .photo()?
            .iter()
            .max_by_key(|p| (p.file.size, p.width * p.height))
            .map(|p| Photo {
                file_id: p.file.id.0.clone(),
                width: p.width,
                height: p.height,
                file_size: p.file.size,
            })
    }
}
