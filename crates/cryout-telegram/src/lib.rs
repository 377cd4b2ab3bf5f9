//! Telegram adapter (teloxide).
//!
//! This crate implements the `cryout-core` MessagingGateway over the
//! Telegram Bot API and feeds inbound updates into the core pipeline.

use async_trait::async_trait;

use teloxide::{prelude::*, types::Recipient};

use tokio::time::sleep;

pub mod router;

use cryout_core::{
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::port::MessagingGateway,
    Result,
};

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_to_user(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await?;
        Ok(())
    }

    async fn send_to_channel(&self, channel: &str, text: &str) -> Result<MessageId> {
        let msg = self
            .with_retry(|| {
                self.bot.send_message(
                    Recipient::ChannelUsername(channel.to_string()),
                    text.to_string(),
                )
            })
            .await?;

        Ok(MessageId(msg.id.0))
    }
}
