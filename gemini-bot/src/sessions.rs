//! Per-chat conversation sessions.

use std::sync::Arc;

use dashmap::DashMap;
use gemini_client::{ChatSession, GeminiChatSession, GeminiClient, InstructionSource};
use tracing::info;

/// Creates sessions. The registry uses it for conversations; image prompts get a one-shot session.
pub trait SessionFactory: Send + Sync {
    fn chat_session(&self) -> Arc<dyn ChatSession>;
    fn vision_session(&self) -> Arc<dyn ChatSession>;
}

/// Builds [`GeminiChatSession`]s that read the system instruction at request time.
pub struct GeminiSessionFactory {
    client: GeminiClient,
    model: String,
    vision_model: String,
    instruction: Arc<dyn InstructionSource>,
}

impl GeminiSessionFactory {
    pub fn new(
        client: GeminiClient,
        model: impl Into<String>,
        vision_model: impl Into<String>,
        instruction: Arc<dyn InstructionSource>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            vision_model: vision_model.into(),
            instruction,
        }
    }
}

impl SessionFactory for GeminiSessionFactory {
    fn chat_session(&self) -> Arc<dyn ChatSession> {
        Arc::new(GeminiChatSession::new(
            self.client.clone(),
            self.model.clone(),
            Arc::clone(&self.instruction),
        ))
    }

    fn vision_session(&self) -> Arc<dyn ChatSession> {
        Arc::new(GeminiChatSession::new(
            self.client.clone(),
            self.vision_model.clone(),
            Arc::clone(&self.instruction),
        ))
    }
}

/// Conversation sessions keyed by chat id. Sessions are created lazily and replaced whole.
///
/// Two renders in the same chat share one session and may interleave their turns.
pub struct SessionRegistry {
    sessions: DashMap<i64, Arc<dyn ChatSession>>,
    factory: Arc<dyn SessionFactory>,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions: DashMap::new(),
            factory,
        }
    }

    /// Session for `chat_id`, creating one on first use.
    pub fn get_or_create(&self, chat_id: i64) -> Arc<dyn ChatSession> {
        self.sessions
            .entry(chat_id)
            .or_insert_with(|| {
                info!(chat_id = chat_id, "creating chat session");
                self.factory.chat_session()
            })
            .value()
            .clone()
    }

    /// Replaces the session for `chat_id` with a fresh one. Renders still holding the old session
    /// finish against it.
    pub fn renew(&self, chat_id: i64) -> Arc<dyn ChatSession> {
        let session = self.factory.chat_session();
        self.sessions.insert(chat_id, Arc::clone(&session));
        info!(chat_id = chat_id, "chat session renewed");
        session
    }

    pub fn get(&self, chat_id: i64) -> Option<Arc<dyn ChatSession>> {
        self.sessions.get(&chat_id).map(|s| s.value().clone())
    }

    /// A session used for a single image prompt, independent of any conversation.
    pub fn one_shot_vision(&self) -> Arc<dyn ChatSession> {
        self.factory.vision_session()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
