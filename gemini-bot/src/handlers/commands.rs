//! Slash commands: /start, /help, /new, /admin, /instruction.
//!
//! Commands addressed to another bot (`/cmd@otherbot`) and unknown commands are ignored silently.
//! Every command ends the chain.

use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::{Bot, BotIdentity, Handler, HandlerResponse, Message, ParseMode, Result, User};
use tracing::{debug, error, info, instrument, warn};

use crate::format::escape_html;
use crate::sessions::SessionRegistry;
use crate::settings::BotSettings;

pub const HELP_TEXT: &str = "Basic commands:
/start - Start the bot
/help - Get help. Shows this message

Chat commands:
/new - Start a new chat session (model will forget previously generated messages)

Admin commands:
/admin <add|del|check> - Manage admins (reply to a user's message to add or remove them)
/instruction <text> - Set the system instruction; without text, show the current one

Send a message to the bot to generate a response.";

const MSG_NEW_SESSION: &str = "New chat session started.";
const MSG_ADMIN_USAGE: &str = "Usage: /admin <add|del|check>";
const MSG_ADMIN_DENIED: &str = "You do not have permission to manage admins.";
const MSG_ADMIN_INVALID: &str = "Invalid action. Use 'add', 'del', or 'check'.";
const MSG_ADD_NEEDS_REPLY: &str = "Please reply to the user's message to add them as an admin.";
const MSG_DEL_NEEDS_REPLY: &str = "Please reply to the user's message to remove them from admins.";
const MSG_CANNOT_REMOVE_OWNER: &str = "You cannot remove the bot owner from admins.";
const MSG_INSTRUCTION_DENIED: &str = "You do not have permission to change the system instruction.";
const MSG_INSTRUCTION_UPDATED: &str = "System instruction updated.";
const MSG_INSTRUCTION_UNSET: &str = "No system instruction is set.";
const MSG_SAVE_FAILED: &str = "Failed to save settings. Please try again later.";

/// A parsed `/name@bot args` command. `name` is lowercase and without the bot suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub name: String,
    pub args: &'a str,
}

/// Parses a command. Returns `None` when `text` is not a command or targets another bot.
pub fn parse_command<'a>(text: &'a str, bot_username: &str) -> Option<Command<'a>> {
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.find(char::is_whitespace) {
        Some(i) => (&body[..i], body[i..].trim()),
        None => (body, ""),
    };
    let name = match head.split_once('@') {
        Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
        Some(_) => return None,
        None => head,
    };
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name: name.to_ascii_lowercase(),
        args,
    })
}

/// HTML link to a user's profile, labelled with their display name.
pub fn mention_html(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        escape_html(&user.display_name())
    )
}

pub struct CommandHandler {
    bot: Arc<dyn Bot>,
    identity: BotIdentity,
    sessions: Arc<SessionRegistry>,
    settings: Arc<BotSettings>,
}

impl CommandHandler {
    pub fn new(
        bot: Arc<dyn Bot>,
        identity: BotIdentity,
        sessions: Arc<SessionRegistry>,
        settings: Arc<BotSettings>,
    ) -> Self {
        Self {
            bot,
            identity,
            sessions,
            settings,
        }
    }

    async fn reply(&self, message: &Message, text: String, mode: ParseMode) -> Result<HandlerResponse> {
        self.bot.reply_to(&message.chat, &message.id, &text, mode).await?;
        Ok(HandlerResponse::Reply(text))
    }

    async fn start(&self, message: &Message) -> Result<HandlerResponse> {
        let text = format!(
            "Hi {}!\n\nStart sending messages with me to generate a response.\n\nSend /new to start a new chat session.",
            mention_html(&message.user)
        );
        self.reply(message, text, ParseMode::Html).await
    }

    async fn new_session(&self, message: &Message) -> Result<HandlerResponse> {
        self.sessions.renew(message.chat.id);
        self.reply(message, MSG_NEW_SESSION.to_string(), ParseMode::Plain)
            .await
    }

    #[instrument(skip(self, message), fields(user_id = message.user.id))]
    async fn admin(&self, message: &Message, args: &str) -> Result<HandlerResponse> {
        let Some(action) = args.split_whitespace().next() else {
            return self
                .reply(message, MSG_ADMIN_USAGE.to_string(), ParseMode::Plain)
                .await;
        };

        let admins = self.settings.admins();
        if action == "check" {
            let text = format!(
                "Current Admins: {:?}\nYour User ID: {}",
                admins.as_slice(),
                message.user.id
            );
            return self.reply(message, text, ParseMode::Plain).await;
        }

        let owner = self.settings.owner();
        if owner != Some(message.user.id) {
            warn!(owner = ?owner, "non-owner tried to manage admins");
            return self
                .reply(message, MSG_ADMIN_DENIED.to_string(), ParseMode::Plain)
                .await;
        }

        match action {
            "add" => {
                let Some(target) = &message.reply_to_user else {
                    return self
                        .reply(message, MSG_ADD_NEEDS_REPLY.to_string(), ParseMode::Plain)
                        .await;
                };
                if admins.contains(&target.id) {
                    let text = format!("User {} is already an admin.", mention_html(target));
                    return self.reply(message, text, ParseMode::Html).await;
                }
                let mut updated = admins.as_ref().clone();
                updated.push(target.id);
                if let Err(e) = self.settings.replace_admins(updated) {
                    error!(error = %e, "failed to persist admin list");
                    return self
                        .reply(message, MSG_SAVE_FAILED.to_string(), ParseMode::Plain)
                        .await;
                }
                info!(target_id = target.id, "admin added");
                let text = format!("User {} has been added as an admin.", mention_html(target));
                self.reply(message, text, ParseMode::Html).await
            }
            "del" => {
                let Some(target) = &message.reply_to_user else {
                    return self
                        .reply(message, MSG_DEL_NEEDS_REPLY.to_string(), ParseMode::Plain)
                        .await;
                };
                if Some(target.id) == owner {
                    return self
                        .reply(message, MSG_CANNOT_REMOVE_OWNER.to_string(), ParseMode::Plain)
                        .await;
                }
                if !admins.contains(&target.id) {
                    let text = format!("User {} is not an admin.", mention_html(target));
                    return self.reply(message, text, ParseMode::Html).await;
                }
                let updated: Vec<i64> = admins.iter().copied().filter(|id| *id != target.id).collect();
                if let Err(e) = self.settings.replace_admins(updated) {
                    error!(error = %e, "failed to persist admin list");
                    return self
                        .reply(message, MSG_SAVE_FAILED.to_string(), ParseMode::Plain)
                        .await;
                }
                info!(target_id = target.id, "admin removed");
                let text = format!("User {} has been removed from admins.", mention_html(target));
                self.reply(message, text, ParseMode::Html).await
            }
            _ => {
                self.reply(message, MSG_ADMIN_INVALID.to_string(), ParseMode::Plain)
                    .await
            }
        }
    }

    #[instrument(skip(self, message, args), fields(user_id = message.user.id))]
    async fn instruction(&self, message: &Message, args: &str) -> Result<HandlerResponse> {
        if !self.settings.is_admin(message.user.id) {
            return self
                .reply(message, MSG_INSTRUCTION_DENIED.to_string(), ParseMode::Plain)
                .await;
        }
        if args.is_empty() {
            let text = match self.settings.instruction() {
                Some(current) => format!("Current system instruction:\n{}", current),
                None => MSG_INSTRUCTION_UNSET.to_string(),
            };
            return self.reply(message, text, ParseMode::Plain).await;
        }
        if let Err(e) = self.settings.replace_instruction(args) {
            error!(error = %e, "failed to persist system instruction");
            return self
                .reply(message, MSG_SAVE_FAILED.to_string(), ParseMode::Plain)
                .await;
        }
        info!(len = args.len(), "system instruction updated");
        self.reply(message, MSG_INSTRUCTION_UPDATED.to_string(), ParseMode::Plain)
            .await
    }
}

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if !message.is_command() {
            return Ok(HandlerResponse::Continue);
        }
        let Some(command) = parse_command(&message.content, &self.identity.username) else {
            debug!(content = %message.content, "command for another bot; ignored");
            return Ok(HandlerResponse::Stop);
        };
        info!(command = %command.name, user_id = message.user.id, chat_id = message.chat.id, "step: command");
        match command.name.as_str() {
            "start" => self.start(message).await,
            "help" => {
                self.reply(message, HELP_TEXT.to_string(), ParseMode::Plain)
                    .await
            }
            "new" => self.new_session(message).await,
            "admin" => self.admin(message, command.args).await,
            "instruction" => self.instruction(message, command.args).await,
            other => {
                debug!(command = %other, "unknown command; ignored");
                Ok(HandlerResponse::Stop)
            }
        }
    }
}
