//! Chat sessions: per-conversation history plus the [`ChatSession`] interface the bot drives.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::client::GeminiClient;
use crate::error::GenerationError;
use crate::stream::{PendingTurn, ResponseStream};
use crate::types::{fragment_from_chunk, Content, GenerateContentRequest, Prompt};

/// A conversation with the model.
///
/// After every successful [`ChatSession::send`] the returned stream must be drained, rewound or
/// discarded; the session never keeps a half-committed turn.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Submits one user turn. A [`GenerationError::Rejected`] prompt commits nothing.
    /// A [`GenerationError::Halted`] turn stays submitted until the caller rewinds it.
    async fn send(&self, prompt: Prompt) -> Result<ResponseStream, GenerationError>;

    /// Removes the most recently submitted turn. Returns false when there was none.
    fn rewind_last_turn(&self) -> bool;

    /// Discards all prior context.
    fn reset(&self);
}

/// Supplies the system instruction at request time, so a changed instruction applies to the next
/// request without rebuilding sessions.
pub trait InstructionSource: Send + Sync {
    fn system_instruction(&self) -> Option<String>;
}

/// Fixed (or absent) instruction.
impl InstructionSource for Option<String> {
    fn system_instruction(&self) -> Option<String> {
        self.clone()
    }
}

#[derive(Debug, Clone)]
struct Turn {
    id: u64,
    user: Content,
    reply: Option<Content>,
}

#[derive(Debug, Default)]
struct History {
    next_id: u64,
    turns: Vec<Turn>,
}

impl History {
    /// Context for the next request: settled turns only.
    fn settled_contents(&self) -> Vec<Content> {
        self.turns
            .iter()
            .filter_map(|t| t.reply.as_ref().map(|r| [t.user.clone(), r.clone()]))
            .flatten()
            .collect()
    }
}

struct GeminiPendingTurn {
    history: Arc<Mutex<History>>,
    id: u64,
}

impl PendingTurn for GeminiPendingTurn {
    fn commit(self: Box<Self>, reply: String) {
        let mut history = self.history.lock();
        if let Some(turn) = history.turns.iter_mut().find(|t| t.id == self.id) {
            turn.reply = Some(Content::model(reply));
        } else {
            debug!(turn_id = self.id, "turn vanished before commit (session reset)");
        }
    }

    fn rewind(self: Box<Self>) {
        self.history.lock().turns.retain(|t| t.id != self.id);
    }
}

/// [`ChatSession`] backed by the Gemini streaming API. History lives in memory only.
pub struct GeminiChatSession {
    client: GeminiClient,
    model: String,
    instruction: Arc<dyn InstructionSource>,
    history: Arc<Mutex<History>>,
}

impl GeminiChatSession {
    pub fn new(
        client: GeminiClient,
        model: impl Into<String>,
        instruction: Arc<dyn InstructionSource>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            instruction,
            history: Arc::new(Mutex::new(History::default())),
        }
    }

    /// Number of turns currently held, settled or pending.
    pub fn turn_count(&self) -> usize {
        self.history.lock().turns.len()
    }

    /// Number of turns whose reply has been committed.
    pub fn settled_turn_count(&self) -> usize {
        self.history
            .lock()
            .turns
            .iter()
            .filter(|t| t.reply.is_some())
            .count()
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    #[instrument(skip(self, prompt), fields(model = %self.model, has_image = prompt.image.is_some()))]
    async fn send(&self, prompt: Prompt) -> Result<ResponseStream, GenerationError> {
        let user = Content::user(&prompt);
        let (id, contents) = {
            let mut history = self.history.lock();
            let id = history.next_id;
            history.next_id += 1;
            let mut contents = history.settled_contents();
            contents.push(user.clone());
            history.turns.push(Turn {
                id,
                user,
                reply: None,
            });
            (id, contents)
        };
        let pending = Box::new(GeminiPendingTurn {
            history: Arc::clone(&self.history),
            id,
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction: self.instruction.system_instruction().map(Content::system),
        };

        let mut chunks = match self.client.stream_generate(&self.model, &request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                pending.rewind();
                return Err(e);
            }
        };

        // The first chunk decides whether the prompt itself was refused.
        let first = chunks.next().await.map(|r| r.and_then(fragment_from_chunk));
        match first {
            Some(Err(GenerationError::Rejected(reason))) => {
                info!(reason = %reason, "prompt rejected");
                pending.rewind();
                return Err(GenerationError::Rejected(reason));
            }
            Some(Err(GenerationError::Halted(reason))) => {
                warn!(reason = %reason, "generation halted before any output");
                return Err(GenerationError::Halted(reason));
            }
            _ => {}
        }

        let rest = chunks.map(|r| r.and_then(fragment_from_chunk));
        let fragments = futures::stream::iter(first).chain(rest).boxed();
        Ok(ResponseStream::new(fragments, pending))
    }

    fn rewind_last_turn(&self) -> bool {
        self.history.lock().turns.pop().is_some()
    }

    fn reset(&self) {
        let mut history = self.history.lock();
        history.turns.clear();
        debug!("chat session reset");
    }
}
