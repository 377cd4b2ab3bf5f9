use std::{env, fs, path::Path, time::Duration};

use crate::{classify, errors::Error, Result};

/// Typed configuration, loaded from the environment (plus an optional `.env`
/// file that never overrides variables already set).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    /// Broadcast channel, `@name` form.
    pub channel_name: String,

    /// Presence selects webhook mode over long polling.
    pub webhook_url: Option<String>,
    pub webhook_port: u16,

    pub moderation_prompt: String,
    pub openai_model: String,
    pub classify_timeout: Duration,

    /// Minimum interval between two accepted submissions from one user.
    pub rate_limit_window: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let openai_api_key = require("OPENAI_API_KEY")?;
        let channel_name = require("TELEGRAM_BOT_CHANNEL_NAME")?;

        let webhook_url = env_str("WEBHOOK_URL").and_then(non_empty);
        let webhook_port = env_u16("WEBHOOK_PORT").unwrap_or(8080);

        let moderation_prompt = env_str("OPENAI_PROMPT")
            .and_then(non_empty)
            .unwrap_or_else(|| classify::DEFAULT_MODERATION_PROMPT.to_string());
        let openai_model = env_str("OPENAI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let classify_timeout = Duration::from_secs(env_u64("CLASSIFY_TIMEOUT_SECS").unwrap_or(30));

        // Default: one submission per 20 minutes.
        let rate_limit_window = Duration::from_secs(env_u64("RATE_LIMIT_WINDOW").unwrap_or(1200));

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            channel_name,
            webhook_url,
            webhook_port,
            moderation_prompt,
            openai_model,
            classify_timeout,
            rate_limit_window,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
