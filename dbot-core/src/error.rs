//! Error types for the bot core.
//!
//! [`DbotError`] is the top-level error; [`HandlerError`] is used for handler failures and
//! [`BotError`] classifies failures of the outbound send/edit channel.

use thiserror::Error;

/// Top-level error for dbot (bot transport, handler, config, IO).
#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Bot error: {0}")]
    Bot(#[from] BotError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Errors produced by handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("No text in message")]
    NoText,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("State error: {0}")]
    State(String),
}

/// Failure of a platform send/edit call, classified so callers can decide per error class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// The platform refused the request as invalid (e.g. markup it cannot parse).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An edit carried exactly the content the message already has.
    #[error("Message is not modified")]
    NotModified,

    /// The platform could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl BotError {
    /// True when Telegram reported "message is not modified"; callers treat it as success.
    pub fn is_not_modified(&self) -> bool {
        match self {
            BotError::NotModified => true,
            BotError::BadRequest(s) | BotError::Other(s) => {
                s.contains("message is not modified") || s.contains("exactly the same")
            }
            BotError::Network(_) => false,
        }
    }
}

/// Result type for core operations; uses [`DbotError`].
pub type Result<T> = std::result::Result<T, DbotError>;
