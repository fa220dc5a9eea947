//! # gemini-bot
//!
//! Telegram front-end for Gemini: streams answers into a placeholder message that is edited as
//! tokens arrive.
//!
//! - [`format`]: markdown → Telegram HTML, valid for every prefix of a growing answer.
//! - [`render`]: the streaming renderer and its failure taxonomy.
//! - [`sessions`]: per-chat sessions; [`settings`]: admin list and system instruction.
//! - [`handlers`]: logging, commands, chat; [`runner`]: wiring and REPL.

pub mod cli;
pub mod config;
pub mod format;
pub mod handlers;
pub mod mention;
pub mod render;
pub mod runner;
pub mod sessions;
pub mod settings;

pub use cli::{Cli, Commands};
pub use config::BotConfig;
pub use format::{escape_html, format_message};
pub use render::{FailureKind, RenderError, RenderReport, RenderState, StreamRenderer};
pub use runner::{build_chain, run_bot};
pub use sessions::{GeminiSessionFactory, SessionFactory, SessionRegistry};
pub use settings::{BotSettings, SettingsError};
