//! Text and photo messages: gate, pick a session, and stream the answer.

use std::sync::Arc;

use async_trait::async_trait;
use dbot_core::{
    Bot, BotIdentity, Handler, HandlerResponse, Message, MessageType, ParseMode, Photo, Result,
};
use gemini_client::{InlineImage, Prompt};
use tracing::{debug, error, info, instrument, warn};

use crate::mention::is_addressed_to_bot;
use crate::render::{
    RenderError, RenderState, StreamRenderer, MSG_NETWORK_DOWN, MSG_REQUEST_FAILED,
};
use crate::sessions::SessionRegistry;

/// Prompt sent with an uncaptioned photo.
pub const DEFAULT_IMAGE_PROMPT: &str = "Analyse this image and generate response";

pub struct ChatHandler {
    bot: Arc<dyn Bot>,
    identity: BotIdentity,
    sessions: Arc<SessionRegistry>,
    renderer: StreamRenderer,
}

impl ChatHandler {
    pub fn new(
        bot: Arc<dyn Bot>,
        identity: BotIdentity,
        sessions: Arc<SessionRegistry>,
        renderer: StreamRenderer,
    ) -> Self {
        Self {
            bot,
            identity,
            sessions,
            renderer,
        }
    }

    /// Photos go to a one-shot session on the vision model; the conversation history is untouched.
    /// A failed download is answered with the generic failure notice.
    async fn photo_prompt(&self, message: &Message, photo: &Photo) -> Option<Prompt> {
        debug!(file_id = %photo.file_id, width = photo.width, height = photo.height, "downloading photo");
        let data = match self.bot.download_file(&photo.file_id).await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, file_id = %photo.file_id, "photo download failed");
                if let Err(e) = self
                    .bot
                    .reply_to(&message.chat, &message.id, MSG_REQUEST_FAILED, ParseMode::Plain)
                    .await
                {
                    warn!(error = %e, "could not report download failure");
                }
                return None;
            }
        };
        let text = if message.content.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT.to_string()
        } else {
            message.content.clone()
        };
        Some(Prompt::with_image(text, InlineImage::jpeg(data)))
    }
}

#[async_trait]
impl Handler for ChatHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, user_id = message.user.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let is_text = message.message_type == MessageType::Text && !message.is_command();
        let is_photo = message.message_type == MessageType::Photo;
        if !is_text && !is_photo {
            return Ok(HandlerResponse::Continue);
        }

        if !is_addressed_to_bot(message, &self.identity) {
            debug!("group message not addressed to the bot; ignored");
            return Ok(HandlerResponse::Stop);
        }

        let (session, prompt) = if is_photo {
            let Some(photo) = &message.photo else {
                return Ok(HandlerResponse::Continue);
            };
            match self.photo_prompt(message, photo).await {
                Some(prompt) => (self.sessions.one_shot_vision(), prompt),
                None => return Ok(HandlerResponse::Stop),
            }
        } else {
            (
                self.sessions.get_or_create(message.chat.id),
                Prompt::text(message.content.clone()),
            )
        };

        match self.renderer.render(message, session.as_ref(), prompt).await {
            Ok(report) => {
                info!(state = ?report.state, edit_calls = report.edit_calls, "step: render finished");
                if report.state == RenderState::Completed && !report.text.trim().is_empty() {
                    Ok(HandlerResponse::Reply(report.text))
                } else {
                    Ok(HandlerResponse::Stop)
                }
            }
            Err(RenderError::Transport { reason, message_id }) => {
                error!(reason = %reason, "render failed: network down");
                if let Err(e) = self
                    .bot
                    .edit_message(&message.chat, &message_id, MSG_NETWORK_DOWN, ParseMode::Plain)
                    .await
                {
                    warn!(error = %e, "could not surface network failure");
                }
                Ok(HandlerResponse::Stop)
            }
            Err(RenderError::Placeholder(e)) => {
                error!(error = %e, "could not send placeholder");
                Err(e.into())
            }
        }
    }
}
