//! Handlers run by the chain, in order: logging → commands → chat.

mod chat;
mod commands;
mod logging;

pub use chat::{ChatHandler, DEFAULT_IMAGE_PROMPT};
pub use commands::{mention_html, parse_command, Command, CommandHandler, HELP_TEXT};
pub use logging::LoggingHandler;
