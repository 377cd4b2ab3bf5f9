use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId},
    Result,
};

/// Outbound side of the chat transport.
///
/// Telegram is the first implementation; the shape is deliberately small so
/// another messenger could fit behind the same interface. Errors from either
/// method are transport errors, propagated as-is to the pipeline.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Reply to the submitter in their private chat.
    async fn send_to_user(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Publish to the broadcast channel, returning the new post's id.
    async fn send_to_channel(&self, channel: &str, text: &str) -> Result<MessageId>;
}
