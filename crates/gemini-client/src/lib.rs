//! # gemini-client
//!
//! Client for the Gemini `streamGenerateContent` API and the chat-session model built on it.
//!
//! - [`GeminiClient`]: HTTP + SSE decoding into typed chunks.
//! - [`ChatSession`] / [`GeminiChatSession`]: per-conversation history with `send`, `rewind_last_turn`, `reset`.
//! - [`ResponseStream`]: the fragment stream of one turn; a guard that settles the turn exactly once.
//! - [`GenerationError`]: failure categories the caller matches on.

mod client;
mod config;
mod error;
mod session;
mod sse;
mod stream;
mod types;

pub use client::{ChunkStream, GeminiClient};
pub use config::{mask_token, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::GenerationError;
pub use session::{ChatSession, GeminiChatSession, InstructionSource};
pub use stream::{FragmentStream, PendingTurn, Release, ResponseStream};
pub use types::{
    fragment_from_chunk, Candidate, Content, FinishReason, Fragment, GenerateContentRequest,
    GenerateContentResponse, InlineData, InlineImage, Part, Prompt, PromptFeedback,
};
