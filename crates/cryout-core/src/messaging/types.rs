use crate::domain::{ChatId, UserId};

/// Incoming update, already reduced to what the pipeline needs.
///
/// Messenger-specific fields stay in the adapter. `text` is `None` for
/// updates without text content (stickers, photos, ...), which the pipeline
/// ignores.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub text: Option<String>,
}
