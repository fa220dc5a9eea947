#![allow(dead_code)]

pub mod mock_bot;
pub mod scripted_session;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use dbot_core::{BotIdentity, Chat, ChatKind, Message, MessageType, Photo, User};

/// Ordered labels of calls made on the test doubles that share it.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub const BOT_ID: i64 = 999;
pub const BOT_USERNAME: &str = "GemBot";

pub fn identity() -> BotIdentity {
    BotIdentity {
        id: BOT_ID,
        username: BOT_USERNAME.to_string(),
    }
}

pub fn user(id: i64, first_name: &str) -> User {
    User {
        id,
        is_bot: false,
        username: None,
        first_name: Some(first_name.to_string()),
        last_name: None,
    }
}

pub fn text_message(kind: ChatKind, from: User, content: &str) -> Message {
    Message {
        id: "10".to_string(),
        user: from,
        chat: Chat { id: 500, kind },
        content: content.to_string(),
        message_type: MessageType::Text,
        photo: None,
        created_at: Utc::now(),
        reply_to_message_id: None,
        reply_to_user: None,
    }
}

pub fn replying_to(mut message: Message, target: User) -> Message {
    message.reply_to_message_id = Some("9".to_string());
    message.reply_to_user = Some(target);
    message
}

pub fn photo_message(kind: ChatKind, from: User, caption: &str) -> Message {
    let mut message = text_message(kind, from, caption);
    message.message_type = MessageType::Photo;
    message.photo = Some(Photo {
        file_id: "photo-file".to_string(),
        width: 1280,
        height: 720,
        file_size: 2048,
    });
    message
}
