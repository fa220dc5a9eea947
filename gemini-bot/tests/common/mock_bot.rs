//! Recording implementation of [`dbot_core::Bot`] for integration tests.
//!
//! Every call is appended to an in-memory log with the (tokio) time it was made, so tests can assert
//! on call order, texts and edit spacing. Edit, reply and download results can be scripted per call.
//! An optional [`Journal`] shared with a session double orders bot calls against session calls.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dbot_core::{Bot, BotError, Chat, ParseMode};
use tokio::time::Instant;

use super::Journal;

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCall {
    Reply {
        reply_to: String,
        text: String,
        parse_mode: ParseMode,
        new_id: String,
    },
    Edit {
        message_id: String,
        text: String,
        parse_mode: ParseMode,
    },
    Typing,
    Download {
        file_id: String,
    },
}

pub struct MockBot {
    calls: Mutex<Vec<(Instant, BotCall)>>,
    next_id: Mutex<u32>,
    edit_results: Mutex<VecDeque<Result<(), BotError>>>,
    reply_results: Mutex<VecDeque<Result<(), BotError>>>,
    download_results: Mutex<VecDeque<Result<(), BotError>>>,
    journal: Option<Journal>,
}

impl MockBot {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(100),
            edit_results: Mutex::new(VecDeque::new()),
            reply_results: Mutex::new(VecDeque::new()),
            download_results: Mutex::new(VecDeque::new()),
            journal: None,
        }
    }

    /// Also appends a short label for every call to `journal`.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new()
        }
    }

    /// Queues the result for the next `download_file` call; unqueued calls succeed.
    pub fn push_download_result(&self, result: Result<(), BotError>) {
        self.download_results.lock().unwrap().push_back(result);
    }

    /// Queues the result for the next `edit_message` call; unqueued calls succeed.
    pub fn push_edit_result(&self, result: Result<(), BotError>) {
        self.edit_results.lock().unwrap().push_back(result);
    }

    /// Queues the result for the next `reply_to` call; unqueued calls succeed.
    pub fn push_reply_result(&self, result: Result<(), BotError>) {
        self.reply_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<BotCall> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, BotCall)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BotCall::Reply { reply_to, text, .. } => Some((reply_to, text)),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BotCall::Edit { message_id, text, .. } => Some((message_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn edit_times(&self) -> Vec<Instant> {
        self.timed_calls()
            .into_iter()
            .filter_map(|(t, c)| matches!(c, BotCall::Edit { .. }).then_some(t))
            .collect()
    }

    /// Text the user ends up seeing in `message_id`: its last successful edit, else what was sent.
    pub fn last_edit_text(&self, message_id: &str) -> Option<String> {
        self.edits()
            .into_iter()
            .rev()
            .find(|(id, _)| id == message_id)
            .map(|(_, text)| text)
    }

    fn record(&self, call: BotCall) {
        if let Some(journal) = &self.journal {
            let label = match &call {
                BotCall::Reply { text, .. } => format!("reply:{}", text),
                BotCall::Edit { text, .. } => format!("edit:{}", text),
                BotCall::Typing => "typing".to_string(),
                BotCall::Download { .. } => "download".to_string(),
            };
            journal.lock().unwrap().push(label);
        }
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(
        &self,
        chat: &Chat,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<String, BotError> {
        self.reply_to(chat, "", text, parse_mode).await
    }

    async fn reply_to(
        &self,
        _chat: &Chat,
        reply_to_message_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<String, BotError> {
        if let Some(Err(e)) = self.reply_results.lock().unwrap().pop_front() {
            return Err(e);
        }
        let new_id = {
            let mut next = self.next_id.lock().unwrap();
            let id = next.to_string();
            *next += 1;
            id
        };
        self.record(BotCall::Reply {
            reply_to: reply_to_message_id.to_string(),
            text: text.to_string(),
            parse_mode,
            new_id: new_id.clone(),
        });
        Ok(new_id)
    }

    async fn edit_message(
        &self,
        _chat: &Chat,
        message_id: &str,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), BotError> {
        self.record(BotCall::Edit {
            message_id: message_id.to_string(),
            text: text.to_string(),
            parse_mode,
        });
        self.edit_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn send_typing(&self, _chat: &Chat) -> Result<(), BotError> {
        self.record(BotCall::Typing);
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, BotError> {
        self.record(BotCall::Download {
            file_id: file_id.to_string(),
        });
        if let Some(Err(e)) = self.download_results.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(vec![0xff, 0xd8, 0xff, 0xe0])
    }
}
