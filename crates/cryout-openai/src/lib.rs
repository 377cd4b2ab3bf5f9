//! OpenAI adapter (moderation verdicts).
//!
//! One chat-completion request per candidate message; the instruction prompt
//! and the message travel together as a single system message.

use async_trait::async_trait;
use serde_json::json;

use cryout_core::{
    classify::{interpret_answer, Classifier, Verdict},
    config::Config,
    errors::Error,
    Result,
};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Only a single-word verdict is expected back.
const MAX_VERDICT_TOKENS: u32 = 10;

#[derive(Clone, Debug)]
pub struct OpenAiClassifier {
    api_key: String,
    model: String,
    prompt: String,
    http: reqwest::Client,
}

impl OpenAiClassifier {
    pub fn new(cfg: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(cfg.classify_timeout)
            .build()
            .expect("reqwest client build");
        Self {
            api_key: cfg.openai_api_key.clone(),
            model: cfg.openai_model.clone(),
            prompt: cfg.moderation_prompt.clone(),
            http,
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [{
                "role": "system",
                "content": format!("{}{}", self.prompt, text),
            }],
            "max_tokens": MAX_VERDICT_TOKENS,
        })
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<Verdict> {
        let resp = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "openai chat completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("openai json error: {e}")))?;

        let answer = v
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                Error::Transport("openai response missing message content".to_string())
            })?;

        Ok(interpret_answer(answer))
    }
}
