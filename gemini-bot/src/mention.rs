//! Group-chat gating: is a message addressed to the bot?

use dbot_core::{BotIdentity, Message};

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True if `text` contains `@bot_username` (case-insensitive) as a whole username, i.e. not as the
/// prefix of a longer one such as `@bot_username_fan`.
pub fn is_bot_mentioned(text: &str, bot_username: &str) -> bool {
    if bot_username.is_empty() {
        return false;
    }
    let needle = format!("@{}", bot_username.to_ascii_lowercase());
    let haystack = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_username_char(c));
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !is_username_char(c));
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

/// In group and supergroup chats the bot only answers when mentioned or replied to; elsewhere always.
pub fn is_addressed_to_bot(message: &Message, identity: &BotIdentity) -> bool {
    if !message.chat.is_group() {
        return true;
    }
    message.is_reply_to_user(identity.id) || is_bot_mentioned(&message.content, &identity.username)
}
