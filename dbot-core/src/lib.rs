//! # dbot-core
//!
//! Core types and traits for the bot: [`Bot`], [`Handler`], message/user/chat types, errors,
//! and tracing initialization. Transport-agnostic; used by dbot-telegram, handler-chain and gemini-bot.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::{parse_message_id, Bot, ParseMode};
pub use error::{BotError, DbotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    BotIdentity, Chat, ChatKind, Handler, HandlerResponse, Message, MessageType, Photo, ToCoreMessage,
    ToCoreUser, User,
};
