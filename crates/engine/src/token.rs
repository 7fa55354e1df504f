//! Heuristic token counts for the workspace engine.
//!
//! Counts are byte lengths divided by four, rounded up, so multi-byte text
//! is over-counted rather than under-counted. Every chat message adds a
//! fixed wire overhead on top of its content.

use contextfit_core::message::Message;

/// Wire overhead per chat message (role tag and delimiters).
pub const MESSAGE_OVERHEAD: usize = 4;

const BYTES_PER_TOKEN: usize = 4;

/// Tokens for raw text such as a rendered file or the repository map.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

pub fn estimate_message_tokens(message: &Message) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&message.content)
}

/// Tokens for a message bundle, e.g. the system prompt plus reminder.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
