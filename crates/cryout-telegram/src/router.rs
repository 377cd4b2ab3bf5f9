use std::{net::SocketAddr, sync::Arc};

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks,
};

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use cryout_core::{
    classify::Classifier,
    config::Config,
    domain::{ChatId, UserId},
    gate::SubmissionGate,
    messaging::{port::MessagingGateway, types::InboundMessage},
    pipeline::Pipeline,
};

use crate::TelegramGateway;

/// Run the bot: start update ingestion (polling or webhook, per config) and
/// drive the moderation pipeline until `cancel` fires.
pub async fn run(
    cfg: Arc<Config>,
    classifier: Arc<dyn Classifier>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!(bot = %me.username(), channel = %cfg.channel_name, "bot started");
    }

    let (tx, rx) = mpsc::channel::<InboundMessage>(128);
    let ingest = spawn_updates(bot.clone(), &cfg, tx, cancel.clone()).await?;

    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot));
    let pipeline = Pipeline::new(
        cfg.channel_name.clone(),
        SubmissionGate::new(cfg.rate_limit_window),
        classifier,
        gateway,
    );
    pipeline.run(rx, cancel).await;

    let _ = ingest.await;
    Ok(())
}

/// Start the update dispatcher on a background task. The dispatcher only
/// deposits updates into the mpsc channel; all decisions happen in the
/// pipeline, strictly in arrival order.
async fn spawn_updates(
    bot: Bot,
    cfg: &Config,
    tx: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let handler = dptree::entry().branch(Update::filter_message().endpoint(forward_update));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![tx])
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        cancel.cancelled().await;
        if let Ok(fut) = shutdown.shutdown() {
            fut.await;
        }
    });

    let handle = match &cfg.webhook_url {
        Some(raw_url) => {
            let url = raw_url
                .parse::<url::Url>()
                .map_err(|e| anyhow::anyhow!("invalid WEBHOOK_URL {raw_url}: {e}"))?;
            let addr = SocketAddr::from(([0, 0, 0, 0], cfg.webhook_port));

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url))
                .await
                .map_err(|e| anyhow::anyhow!("webhook registration failed: {e}"))?;

            tracing::info!(port = cfg.webhook_port, "running in webhook mode");
            tokio::spawn(async move {
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("webhook listener error"),
                    )
                    .await;
            })
        }
        None => {
            tracing::info!("running in polling mode");
            tokio::spawn(async move {
                dispatcher.dispatch().await;
            })
        }
    };

    Ok(handle)
}

async fn forward_update(msg: Message, tx: mpsc::Sender<InboundMessage>) -> ResponseResult<()> {
    // Channel posts and service messages carry no sender; nothing to gate.
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let inbound = InboundMessage {
        user_id: UserId(user.id.0 as i64),
        chat_id: ChatId(msg.chat.id.0),
        username: user.username.clone(),
        text: msg.text().map(|s| s.to_string()),
    };

    // A closed channel means the pipeline is shutting down; drop the update.
    let _ = tx.send(inbound).await;
    Ok(())
}
