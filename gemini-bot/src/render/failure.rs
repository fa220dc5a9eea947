//! Failure taxonomy shared by the backend and the platform, and the notices shown for each.

use dbot_core::BotError;
use gemini_client::GenerationError;

pub const MSG_GENERATING: &str = "Generating...";
pub const MSG_BLOCKED: &str = "Blocked due to safety concerns.";
pub const MSG_HALTED: &str = "The model unexpectedly stopped generating.";
pub const MSG_UNSUPPORTED: &str = "Some index error occurred. This response is not supported.";
pub const MSG_NETWORK_DOWN: &str = "Looks like your network is down. Please try again later.";
pub const MSG_EMPTY_RESPONSE: &str = "The model returned an empty response.";
pub const MSG_REQUEST_FAILED: &str =
    "Sorry, something went wrong processing your request. Please try again later.";

/// Why a render did not complete normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Prompt blocked before any output.
    Rejected,
    /// Model stopped mid-generation.
    Halted,
    /// Response carried something other than text.
    UnsupportedShape,
    /// Backend or platform unreachable.
    Transport,
    /// Platform refused our markup.
    DisplayRejected,
    Other,
}

impl FailureKind {
    pub fn from_generation(e: &GenerationError) -> Self {
        match e {
            GenerationError::Rejected(_) => FailureKind::Rejected,
            GenerationError::Halted(_) => FailureKind::Halted,
            GenerationError::UnsupportedShape(_) => FailureKind::UnsupportedShape,
            GenerationError::Transport(_) => FailureKind::Transport,
            GenerationError::Api { .. } | GenerationError::Other(_) => FailureKind::Other,
        }
    }

    /// `None` when the platform error is really a success ("message is not modified").
    pub fn from_platform(e: &BotError) -> Option<Self> {
        if e.is_not_modified() {
            return None;
        }
        Some(match e {
            BotError::BadRequest(_) => FailureKind::DisplayRejected,
            BotError::Network(_) => FailureKind::Transport,
            BotError::NotModified | BotError::Other(_) => FailureKind::Other,
        })
    }

    /// User-facing text for failures that end a render with a notice.
    pub fn notice(&self) -> &'static str {
        match self {
            FailureKind::Rejected => MSG_BLOCKED,
            FailureKind::Halted => MSG_HALTED,
            FailureKind::UnsupportedShape => MSG_UNSUPPORTED,
            FailureKind::Transport => MSG_NETWORK_DOWN,
            FailureKind::DisplayRejected | FailureKind::Other => MSG_REQUEST_FAILED,
        }
    }
}
