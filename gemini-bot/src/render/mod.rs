//! Streaming renderer: turns one generation into a progressively edited chat message.
//!
//! [`StreamRenderer::render`] replies with a placeholder, opens a generation against the session and
//! re-renders the growing answer into the placeholder at most once per edit interval. Every exit
//! path settles the [`ResponseStream`] (drained, rewound or discarded) so the session never keeps a
//! half-committed turn.
//!
//! # States
//!
//! `Started → Streaming → Completed | FailedRecoverable(kind) | FailedFatal`

mod failure;
mod throttle;

pub use failure::{
    FailureKind, MSG_BLOCKED, MSG_EMPTY_RESPONSE, MSG_GENERATING, MSG_HALTED, MSG_NETWORK_DOWN,
    MSG_REQUEST_FAILED, MSG_UNSUPPORTED,
};
pub use throttle::EditThrottle;

use std::sync::Arc;
use std::time::Duration;

use dbot_core::{Bot, BotError, Chat, Message, ParseMode};
use gemini_client::{ChatSession, GenerationError, Prompt, ResponseStream};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::format::{escape_html, format_message};

/// Where a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Started,
    Streaming,
    Completed,
    FailedRecoverable(FailureKind),
    FailedFatal,
}

/// Outcome of a render that did not fail fatally.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub state: RenderState,
    /// Plain text accumulated from the stream.
    pub text: String,
    /// Message currently holding the answer (the placeholder, or a fresh message that replaced it).
    pub message_id: String,
    pub edit_calls: usize,
}

#[derive(Error, Debug)]
pub enum RenderError {
    /// The placeholder could not be sent; nothing was submitted to the model.
    #[error("failed to send placeholder: {0}")]
    Placeholder(BotError),

    /// Backend or platform unreachable. The stream, if any, has been rewound.
    #[error("transport failure: {reason}")]
    Transport {
        reason: String,
        /// Placeholder to surface the failure in.
        message_id: String,
    },
}

/// The message being edited plus the markup it is known to show.
struct EditTarget<'a> {
    chat: &'a Chat,
    message_id: String,
    last_applied: Option<String>,
}

enum EditOutcome {
    Applied,
    Dropped,
    Transport(String),
    Failed(BotError),
}

/// Renders generations into chat messages. Cheap to clone.
#[derive(Clone)]
pub struct StreamRenderer {
    bot: Arc<dyn Bot>,
    edit_interval: Duration,
}

impl StreamRenderer {
    pub fn new(bot: Arc<dyn Bot>, edit_interval: Duration) -> Self {
        Self { bot, edit_interval }
    }

    /// Runs one generation for `message` against `session` and streams it into a reply.
    ///
    /// Only transport failures are returned as errors; every other failure ends in a notice and a
    /// [`RenderReport`] with [`RenderState::FailedRecoverable`].
    #[instrument(skip(self, message, session, prompt), fields(chat_id = message.chat.id, message_id = %message.id))]
    pub async fn render(
        &self,
        message: &Message,
        session: &dyn ChatSession,
        prompt: Prompt,
    ) -> Result<RenderReport, RenderError> {
        let chat = &message.chat;
        let mut throttle = EditThrottle::new(self.edit_interval);

        let placeholder = self
            .bot
            .reply_to(chat, &message.id, MSG_GENERATING, ParseMode::Plain)
            .await
            .map_err(RenderError::Placeholder)?;
        throttle.mark_attempt();
        info!(placeholder_id = %placeholder, state = ?RenderState::Started, "step: placeholder sent");

        if let Err(e) = self.bot.send_typing(chat).await {
            debug!(error = %e, "typing action failed");
        }

        let mut target = EditTarget {
            chat,
            message_id: placeholder,
            last_applied: Some(MSG_GENERATING.to_string()),
        };
        let mut edit_calls = 0usize;

        let mut stream = match session.send(prompt).await {
            Ok(stream) => stream,
            Err(e) => return self.fail_before_stream(session, &target, e).await,
        };
        info!(state = ?RenderState::Streaming, "step: streaming");

        let mut buffer = String::new();
        while let Some(item) = stream.next().await {
            let fragment = match item {
                Ok(fragment) => fragment,
                Err(e) => {
                    let kind = FailureKind::from_generation(&e);
                    match kind {
                        FailureKind::Halted | FailureKind::Rejected => {
                            warn!(error = %e, kind = ?kind, "generation stopped mid-stream; rewinding turn");
                            self.show_notice(&target, kind.notice()).await;
                            stream.rewind();
                            return Ok(recoverable(kind, buffer, target.message_id, edit_calls));
                        }
                        FailureKind::UnsupportedShape => {
                            warn!(error = %e, "unsupported response shape; discarding stream");
                            if let Err(err) = self
                                .bot
                                .reply_to(chat, &target.message_id, MSG_UNSUPPORTED, ParseMode::Plain)
                                .await
                            {
                                warn!(error = %err, "failed to send unsupported-response notice");
                            }
                            stream.discard();
                            return Ok(recoverable(kind, buffer, target.message_id, edit_calls));
                        }
                        FailureKind::Transport => {
                            return Err(self.fatal(stream, &target, e.to_string()));
                        }
                        FailureKind::DisplayRejected | FailureKind::Other => {
                            error!(error = %e, "unexpected generation error; continuing");
                            let markup = format_message(&buffer);
                            if !markup.trim().is_empty() {
                                self.send_fresh(&mut target, &markup).await;
                            }
                            continue;
                        }
                    }
                }
            };

            let Some(text) = fragment.text.filter(|t| !t.is_empty()) else {
                continue;
            };
            buffer.push_str(&text);

            let markup = format_message(&buffer);
            // the platform refuses empty text
            if markup.trim().is_empty() || target.last_applied.as_deref() == Some(markup.as_str()) {
                continue;
            }
            if !throttle.ready() {
                debug!(buffer_len = buffer.len(), "edit throttled");
                continue;
            }
            throttle.mark_attempt();
            edit_calls += 1;
            match self.apply_edit(&mut target, &markup).await {
                EditOutcome::Applied => {}
                EditOutcome::Dropped => debug!("edit rejected by platform; dropped"),
                EditOutcome::Transport(reason) => return Err(self.fatal(stream, &target, reason)),
                EditOutcome::Failed(e) => {
                    error!(error = %e, "edit failed; moving answer to a fresh message");
                    self.send_fresh(&mut target, &markup).await;
                }
            }
        }

        info!(state = ?RenderState::Completed, text_len = buffer.len(), "step: stream drained");
        let markup = format_message(&buffer);
        if markup.trim().is_empty() {
            self.show_notice(&target, MSG_EMPTY_RESPONSE).await;
            return Ok(RenderReport {
                state: RenderState::Completed,
                text: buffer,
                message_id: target.message_id,
                edit_calls,
            });
        }

        if target.last_applied.as_deref() != Some(markup.as_str()) {
            edit_calls += 1;
            match self.apply_edit(&mut target, &markup).await {
                EditOutcome::Applied => {}
                EditOutcome::Dropped => {
                    warn!("final markup rejected; falling back to plain text");
                    edit_calls += 1;
                    let plain = escape_html(&buffer);
                    match self.apply_edit(&mut target, &plain).await {
                        EditOutcome::Applied => {}
                        EditOutcome::Transport(reason) => {
                            return Err(self.transport_error(&target, reason))
                        }
                        EditOutcome::Dropped | EditOutcome::Failed(_) => {
                            error!("plain-text fallback rejected too")
                        }
                    }
                }
                EditOutcome::Transport(reason) => return Err(self.transport_error(&target, reason)),
                EditOutcome::Failed(e) => {
                    error!(error = %e, "final edit failed; moving answer to a fresh message");
                    self.send_fresh(&mut target, &markup).await;
                }
            }
        }

        Ok(RenderReport {
            state: RenderState::Completed,
            text: buffer,
            message_id: target.message_id,
            edit_calls,
        })
    }

    /// `send` itself failed, so there is no stream to settle.
    async fn fail_before_stream(
        &self,
        session: &dyn ChatSession,
        target: &EditTarget<'_>,
        e: GenerationError,
    ) -> Result<RenderReport, RenderError> {
        let kind = FailureKind::from_generation(&e);
        match kind {
            FailureKind::Transport => {
                error!(error = %e, state = ?RenderState::FailedFatal, "backend unreachable");
                Err(RenderError::Transport {
                    reason: e.to_string(),
                    message_id: target.message_id.clone(),
                })
            }
            FailureKind::Halted => {
                warn!(error = %e, "generation halted before output; rewinding turn");
                session.rewind_last_turn();
                self.show_notice(target, kind.notice()).await;
                Ok(recoverable(kind, String::new(), target.message_id.clone(), 0))
            }
            FailureKind::Rejected | FailureKind::UnsupportedShape => {
                warn!(error = %e, kind = ?kind, "generation refused");
                self.show_notice(target, kind.notice()).await;
                Ok(recoverable(kind, String::new(), target.message_id.clone(), 0))
            }
            FailureKind::DisplayRejected | FailureKind::Other => {
                error!(error = %e, "generation request failed");
                self.show_notice(target, kind.notice()).await;
                Ok(recoverable(FailureKind::Other, String::new(), target.message_id.clone(), 0))
            }
        }
    }

    async fn apply_edit(&self, target: &mut EditTarget<'_>, markup: &str) -> EditOutcome {
        let result = self
            .bot
            .edit_message(target.chat, &target.message_id, markup, ParseMode::Html)
            .await;
        let err = match result {
            Ok(()) => {
                target.last_applied = Some(markup.to_string());
                return EditOutcome::Applied;
            }
            Err(e) => e,
        };
        match FailureKind::from_platform(&err) {
            None => {
                debug!("message not modified");
                target.last_applied = Some(markup.to_string());
                EditOutcome::Applied
            }
            Some(FailureKind::DisplayRejected) => EditOutcome::Dropped,
            Some(FailureKind::Transport) => EditOutcome::Transport(err.to_string()),
            Some(_) => EditOutcome::Failed(err),
        }
    }

    /// Replaces the edit target with a fresh reply to it holding `markup`. Best effort.
    async fn send_fresh(&self, target: &mut EditTarget<'_>, markup: &str) {
        match self
            .bot
            .reply_to(target.chat, &target.message_id, markup, ParseMode::Html)
            .await
        {
            Ok(id) => {
                debug!(new_message_id = %id, "edit target replaced");
                target.message_id = id;
                target.last_applied = Some(markup.to_string());
            }
            Err(e) => warn!(error = %e, "failed to send fresh message"),
        }
    }

    /// Best-effort plain-text edit of the target.
    async fn show_notice(&self, target: &EditTarget<'_>, notice: &str) {
        if let Err(e) = self
            .bot
            .edit_message(target.chat, &target.message_id, notice, ParseMode::Plain)
            .await
        {
            if !e.is_not_modified() {
                warn!(error = %e, notice = notice, "failed to show notice");
            }
        }
    }

    fn fatal(&self, stream: ResponseStream, target: &EditTarget<'_>, reason: String) -> RenderError {
        stream.rewind();
        self.transport_error(target, reason)
    }

    fn transport_error(&self, target: &EditTarget<'_>, reason: String) -> RenderError {
        error!(reason = %reason, state = ?RenderState::FailedFatal, "transport failure");
        RenderError::Transport {
            reason,
            message_id: target.message_id.clone(),
        }
    }
}

fn recoverable(
    kind: FailureKind,
    text: String,
    message_id: String,
    edit_calls: usize,
) -> RenderReport {
    info!(state = ?RenderState::FailedRecoverable(kind), "step: render ended");
    RenderReport {
        state: RenderState::FailedRecoverable(kind),
        text,
        message_id,
        edit_calls,
    }
}
