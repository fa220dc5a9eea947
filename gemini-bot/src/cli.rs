//! Command-line interface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gemini-bot")]
#[command(about = "Telegram bot that streams Gemini answers into chat", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling).
    Run {
        /// Telegram bot token; overrides BOT_TOKEN.
        #[arg(short, long)]
        token: Option<String>,
    },
}
