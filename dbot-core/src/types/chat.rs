//! Chat identity type for core messages.

use serde::{Deserialize, Serialize};

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Chat (private, group or channel) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
}

impl Chat {
    /// True for multi-user rooms, where the bot only answers when addressed.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_group() {
        let chat = |kind| Chat { id: 1, kind };
        assert!(chat(ChatKind::Group).is_group());
        assert!(chat(ChatKind::Supergroup).is_group());
        assert!(!chat(ChatKind::Private).is_group());
        assert!(!chat(ChatKind::Channel).is_group());
    }

    #[test]
    fn test_chat_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ChatKind::Supergroup).unwrap();
        assert_eq!(json, "\"supergroup\"");
    }
}
