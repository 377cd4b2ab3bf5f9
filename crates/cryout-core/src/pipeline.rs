use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    classify::Classifier,
    domain::MessageId,
    gate::{Decision, SubmissionGate},
    links,
    messaging::{port::MessagingGateway, types::InboundMessage},
    texts,
};

/// Terminal state of processing one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    RulesSent,
    RateLimited,
    Duplicate,
    ClassifyFailed,
    Rejected,
    PublishFailed,
    Published(MessageId),
}

/// Sequential moderation pipeline: gate check, classifier verdict, channel
/// publish, gate commit, confirmation reply.
pub struct Pipeline {
    channel_name: String,
    gate: SubmissionGate,
    classifier: Arc<dyn Classifier>,
    gateway: Arc<dyn MessagingGateway>,
}

impl Pipeline {
    pub fn new(
        channel_name: String,
        gate: SubmissionGate,
        classifier: Arc<dyn Classifier>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            channel_name,
            gate,
            classifier,
            gateway,
        }
    }

    /// Drain inbound messages one at a time until cancellation fires or the
    /// update stream closes. Messages still queued when cancellation fires
    /// are dropped, not drained.
    pub async fn run(&self, mut updates: mpsc::Receiver<InboundMessage>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("stopping update processing");
                    return;
                }
                maybe = updates.recv() => {
                    let Some(update) = maybe else {
                        tracing::info!("update stream closed");
                        return;
                    };
                    self.process(update).await;
                }
            }
        }
    }

    /// Process one message through to a terminal state. Never fails: every
    /// per-message error is reported to the submitter and logged here.
    pub async fn process(&self, update: InboundMessage) -> Outcome {
        let Some(text) = update.text.filter(|t| !t.is_empty()) else {
            return Outcome::Ignored;
        };
        let user_id = update.user_id;
        let chat_id = update.chat_id;
        let username = update.username.as_deref().unwrap_or("unknown");

        // Bootstrap command: rules only, not a submission.
        if text == texts::START_COMMAND {
            let _ = self.gateway.send_to_user(chat_id, texts::RULES).await;
            return Outcome::RulesSent;
        }

        match self.gate.evaluate(user_id, &text) {
            Decision::RateLimited => {
                let notice = texts::rate_limited_notice(self.gate.window());
                let _ = self.gateway.send_to_user(chat_id, &notice).await;
                tracing::warn!(user_id = user_id.0, username, text = %text, "rate limited submission");
                return Outcome::RateLimited;
            }
            Decision::Duplicate => {
                let _ = self.gateway.send_to_user(chat_id, texts::DUPLICATE_NOTICE).await;
                tracing::warn!(user_id = user_id.0, username, text = %text, "duplicate submission");
                return Outcome::Duplicate;
            }
            Decision::Allowed => {}
        }

        let verdict = match self.classifier.classify(&text).await {
            Ok(v) => v,
            Err(e) => {
                let _ = self.gateway.send_to_user(chat_id, texts::CHECK_FAILED_NOTICE).await;
                tracing::error!(user_id = user_id.0, username, text = %text, error = %e, "classifier call failed");
                return Outcome::ClassifyFailed;
            }
        };

        tracing::info!(user_id = user_id.0, username, text = %text, answer = %verdict.raw_answer, "classifier verdict");

        if !verdict.approved {
            let _ = self.gateway.send_to_user(chat_id, &texts::rejected_notice()).await;
            return Outcome::Rejected;
        }

        let message_id = match self.gateway.send_to_channel(&self.channel_name, &text).await {
            Ok(id) => id,
            Err(e) => {
                let _ = self.gateway.send_to_user(chat_id, texts::PUBLISH_FAILED_NOTICE).await;
                tracing::error!(user_id = user_id.0, username, text = %text, error = %e, "channel publish failed");
                return Outcome::PublishFailed;
            }
        };

        // Commit only after the publish went through, so a failed attempt
        // stays resubmittable.
        self.gate.commit(user_id, &text);

        let link = links::channel_post_link(&self.channel_name, message_id);
        let _ = self
            .gateway
            .send_to_user(chat_id, &texts::published_notice(&link))
            .await;
        tracing::info!(user_id = user_id.0, username, text = %text, link = %link, "submission published");

        Outcome::Published(message_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::classify::{interpret_answer, Verdict};
    use crate::domain::{ChatId, UserId};
    use crate::errors::Error;
    use crate::Result;

    const CHANNEL: &str = "@cryout_channel";
    const WINDOW: Duration = Duration::from_secs(1200);

    #[derive(Default)]
    struct RecordingGateway {
        replies: Mutex<Vec<(i64, String)>>,
        published: Mutex<Vec<String>>,
        fail_publish: AtomicBool,
        next_message_id: AtomicI32,
    }

    impl RecordingGateway {
        fn last_reply(&self) -> String {
            self.replies.lock().unwrap().last().unwrap().1.clone()
        }

        fn published_count(&self) -> usize {
            self.published.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn send_to_user(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.replies.lock().unwrap().push((chat_id.0, text.to_string()));
            Ok(())
        }

        async fn send_to_channel(&self, _channel: &str, text: &str) -> Result<MessageId> {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(Error::Transport("channel publish down".to_string()));
            }
            self.published.lock().unwrap().push(text.to_string());
            let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(MessageId(id))
        }
    }

    struct ScriptedClassifier {
        /// `None` simulates a transport failure.
        answer: Option<String>,
        calls: AtomicU32,
    }

    impl ScriptedClassifier {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _text: &str) -> Result<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Some(a) => Ok(interpret_answer(a)),
                None => Err(Error::Transport("classifier timed out".to_string())),
            }
        }
    }

    fn pipeline(
        window: Duration,
        classifier: Arc<ScriptedClassifier>,
        gateway: Arc<RecordingGateway>,
    ) -> Pipeline {
        Pipeline::new(
            CHANNEL.to_string(),
            SubmissionGate::new(window),
            classifier,
            gateway,
        )
    }

    fn inbound(user: i64, text: Option<&str>) -> InboundMessage {
        InboundMessage {
            user_id: UserId(user),
            chat_id: ChatId(user),
            username: Some("tester".to_string()),
            text: text.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn approved_message_is_published_with_link() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier.clone(), gateway.clone());

        let text = "Помогите мне, очень тяжело на душе";
        let outcome = pipeline.process(inbound(1, Some(text))).await;

        assert_eq!(outcome, Outcome::Published(MessageId(1)));
        {
            let published = gateway.published.lock().unwrap();
            assert_eq!(published.len(), 1);
            assert_eq!(published[0], text);
        }
        assert!(gateway.last_reply().contains("https://t.me/cryout_channel/1"));
    }

    #[tokio::test]
    async fn immediate_resend_hits_the_cooldown_first() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier.clone(), gateway.clone());

        let text = "Помогите мне, очень тяжело на душе";
        pipeline.process(inbound(1, Some(text))).await;
        let outcome = pipeline.process(inbound(1, Some(text))).await;

        assert_eq!(outcome, Outcome::RateLimited);
        assert!(gateway.last_reply().contains("⏳"));
        assert_eq!(classifier.calls(), 1);
        assert_eq!(gateway.published_count(), 1);
    }

    #[tokio::test]
    async fn same_text_after_cooldown_is_duplicate_without_classifier_call() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        // Zero window: the cooldown never applies, only duplicate detection.
        let pipeline = pipeline(Duration::ZERO, classifier.clone(), gateway.clone());

        pipeline.process(inbound(1, Some("тот же текст"))).await;
        let outcome = pipeline.process(inbound(1, Some("тот же текст"))).await;

        assert_eq!(outcome, Outcome::Duplicate);
        assert_eq!(gateway.last_reply(), texts::DUPLICATE_NOTICE);
        assert_eq!(classifier.calls(), 1);
        assert_eq!(gateway.published_count(), 1);
    }

    #[tokio::test]
    async fn negative_verdict_replies_with_rules_and_does_not_commit() {
        let classifier = Arc::new(ScriptedClassifier::answering("нет"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(Duration::ZERO, classifier.clone(), gateway.clone());

        let outcome = pipeline.process(inbound(1, Some("spam"))).await;
        assert_eq!(outcome, Outcome::Rejected);
        assert!(gateway.last_reply().contains(texts::RULES));
        assert_eq!(gateway.published_count(), 0);

        // Gate was not committed: the identical text is classified again
        // instead of being flagged as duplicate.
        let outcome = pipeline.process(inbound(1, Some("spam"))).await;
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(classifier.calls(), 2);
    }

    #[tokio::test]
    async fn classifier_failure_replies_retry_and_does_not_commit() {
        let classifier = Arc::new(ScriptedClassifier::failing());
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(Duration::ZERO, classifier.clone(), gateway.clone());

        let outcome = pipeline.process(inbound(1, Some("текст"))).await;
        assert_eq!(outcome, Outcome::ClassifyFailed);
        assert_eq!(gateway.last_reply(), texts::CHECK_FAILED_NOTICE);
        assert_eq!(gateway.published_count(), 0);

        let outcome = pipeline.process(inbound(1, Some("текст"))).await;
        assert_eq!(outcome, Outcome::ClassifyFailed);
        assert_eq!(classifier.calls(), 2);
    }

    #[tokio::test]
    async fn publish_failure_keeps_text_resubmittable() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        gateway.fail_publish.store(true, Ordering::SeqCst);
        let pipeline = pipeline(Duration::ZERO, classifier.clone(), gateway.clone());

        let outcome = pipeline.process(inbound(1, Some("текст"))).await;
        assert_eq!(outcome, Outcome::PublishFailed);
        assert_eq!(gateway.last_reply(), texts::PUBLISH_FAILED_NOTICE);

        gateway.fail_publish.store(false, Ordering::SeqCst);
        let outcome = pipeline.process(inbound(1, Some("текст"))).await;
        assert_eq!(outcome, Outcome::Published(MessageId(1)));
    }

    #[tokio::test]
    async fn start_command_bypasses_gate_and_classifier() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier.clone(), gateway.clone());

        let outcome = pipeline.process(inbound(1, Some("/start"))).await;
        assert_eq!(outcome, Outcome::RulesSent);
        assert_eq!(gateway.last_reply(), texts::RULES);
        assert_eq!(classifier.calls(), 0);

        // The command did not consume the submission slot.
        let outcome = pipeline.process(inbound(1, Some("первое сообщение"))).await;
        assert_eq!(outcome, Outcome::Published(MessageId(1)));
    }

    #[tokio::test]
    async fn updates_without_text_are_ignored() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier.clone(), gateway.clone());

        let outcome = pipeline.process(inbound(1, None)).await;
        assert_eq!(outcome, Outcome::Ignored);
        let outcome = pipeline.process(inbound(1, Some(""))).await;
        assert_eq!(outcome, Outcome::Ignored);
        assert!(gateway.replies.lock().unwrap().is_empty());
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier, gateway);

        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Returns promptly instead of blocking on an empty channel.
        pipeline.run(rx, cancel).await;
    }

    #[tokio::test]
    async fn run_stops_when_update_stream_closes() {
        let classifier = Arc::new(ScriptedClassifier::answering("да"));
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = pipeline(WINDOW, classifier.clone(), gateway.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send(inbound(1, Some("первое сообщение"))).await.unwrap();
        drop(tx);

        pipeline.run(rx, CancellationToken::new()).await;
        assert_eq!(gateway.published_count(), 1);
    }
}
