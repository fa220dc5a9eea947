//! Message types for the core model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{chat::Chat, user::User};

/// What the inbound message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Photo,
    Other,
}

/// A photo attachment; the adapter keeps only the largest available size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u32,
}

/// A single inbound message with user, chat, content, and optional reply context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    /// Text of a text message, or the caption of a photo (empty when absent).
    pub content: String,
    pub message_type: MessageType,
    pub photo: Option<Photo>,
    pub created_at: DateTime<Utc>,
    pub reply_to_message_id: Option<String>,
    /// Sender of the replied-to message; used for reply-to-bot gating and admin targeting.
    pub reply_to_user: Option<User>,
}

impl Message {
    /// True when this message replies to a message sent by the user with `user_id`.
    pub fn is_reply_to_user(&self, user_id: i64) -> bool {
        self.reply_to_user
            .as_ref()
            .map(|u| u.id == user_id)
            .unwrap_or(false)
    }

    /// True when the content starts with a `/command`.
    pub fn is_command(&self) -> bool {
        self.message_type == MessageType::Text && self.content.starts_with('/')
    }
}
