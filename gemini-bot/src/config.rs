//! Bot configuration loaded from environment variables (after `.env`).

use std::env;
use std::time::Duration;

use anyhow::Result;
use dbot_telegram::TelegramConfig;
use gemini_client::GeminiConfig;

pub const DEFAULT_EDIT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LOG_FILE: &str = "logs/gemini-bot.log";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Everything the bot needs at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub gemini: GeminiConfig,
    pub log_file: String,
    /// Minimum spacing between edits of the streamed reply (TELEGRAM_EDIT_INTERVAL_MS).
    pub edit_interval: Duration,
    /// File that stores ADMINS and SYSTEM_INSTRUCTION (ENV_FILE).
    pub env_file: String,
}

impl BotConfig {
    /// Loads from env. `token` overrides BOT_TOKEN.
    pub fn load(token: Option<String>) -> Result<Self> {
        let telegram = TelegramConfig::from_env(token)?;
        let gemini = GeminiConfig::from_env()?;
        let log_file = non_empty_var("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let edit_interval_ms = non_empty_var("TELEGRAM_EDIT_INTERVAL_MS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_EDIT_INTERVAL_MS);
        let env_file = non_empty_var("ENV_FILE").unwrap_or_else(|| DEFAULT_ENV_FILE.to_string());
        Ok(Self {
            telegram,
            gemini,
            log_file,
            edit_interval: Duration::from_millis(edit_interval_ms),
            env_file,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
