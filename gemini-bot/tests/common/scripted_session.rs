//! [`ChatSession`] double that plays back scripted fragments and records how each turn was settled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use gemini_client::{
    ChatSession, Fragment, GenerationError, PendingTurn, Prompt, ResponseStream,
};

use super::Journal;

/// One scripted stream item, delivered after `delay`.
pub type Step = (Duration, Result<Fragment, GenerationError>);

/// What happened to each submitted turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Committed(String),
    Rewound,
    RewindLastTurn,
    Reset,
}

/// The scripted outcome of one `send`.
pub enum Script {
    Fail(GenerationError),
    Stream(Vec<Step>),
}

#[derive(Default)]
pub struct ScriptedSession {
    scripts: Mutex<VecDeque<Script>>,
    pub prompts: Mutex<Vec<Prompt>>,
    pub events: Arc<Mutex<Vec<TurnEvent>>>,
    /// Number of stream items actually pulled by the consumer.
    pub pulled: Arc<Mutex<usize>>,
    journal: Option<Journal>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also appends `rewind_last_turn` to `journal` when that is called.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn push(&self, script: Script) -> &Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    /// Fragments delivered back to back.
    pub fn push_fragments(&self, items: Vec<Result<Fragment, GenerationError>>) -> &Self {
        self.push(Script::Stream(
            items.into_iter().map(|i| (Duration::ZERO, i)).collect(),
        ))
    }

    pub fn events(&self) -> Vec<TurnEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn pulled(&self) -> usize {
        *self.pulled.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

struct RecordedTurn(Arc<Mutex<Vec<TurnEvent>>>);

impl PendingTurn for RecordedTurn {
    fn commit(self: Box<Self>, reply: String) {
        self.0.lock().unwrap().push(TurnEvent::Committed(reply));
    }

    fn rewind(self: Box<Self>) {
        self.0.lock().unwrap().push(TurnEvent::Rewound);
    }
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn send(&self, prompt: Prompt) -> Result<ResponseStream, GenerationError> {
        self.prompts.lock().unwrap().push(prompt);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Stream(Vec::new()));
        let steps = match script {
            Script::Fail(e) => return Err(e),
            Script::Stream(steps) => steps,
        };
        let pulled = Arc::clone(&self.pulled);
        let fragments = futures::stream::iter(steps)
            .then(move |(delay, item)| {
                let pulled = Arc::clone(&pulled);
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    *pulled.lock().unwrap() += 1;
                    item
                }
            })
            .boxed();
        Ok(ResponseStream::new(
            fragments,
            Box::new(RecordedTurn(Arc::clone(&self.events))),
        ))
    }

    fn rewind_last_turn(&self) -> bool {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push("rewind_last_turn".to_string());
        }
        self.events.lock().unwrap().push(TurnEvent::RewindLastTurn);
        true
    }

    fn reset(&self) {
        self.events.lock().unwrap().push(TurnEvent::Reset);
    }
}

/// Hands out the same scripted sessions every time, counting how many conversations were opened.
pub struct ScriptedFactory {
    pub chat: Arc<ScriptedSession>,
    pub vision: Arc<ScriptedSession>,
    created: Mutex<usize>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            chat: Arc::new(ScriptedSession::new()),
            vision: Arc::new(ScriptedSession::new()),
            created: Mutex::new(0),
        }
    }

    pub fn created(&self) -> usize {
        *self.created.lock().unwrap()
    }
}

impl gemini_bot::SessionFactory for ScriptedFactory {
    fn chat_session(&self) -> Arc<dyn ChatSession> {
        *self.created.lock().unwrap() += 1;
        self.chat.clone()
    }

    fn vision_session(&self) -> Arc<dyn ChatSession> {
        self.vision.clone()
    }
}
