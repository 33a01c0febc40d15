use std::str::FromStr;
use std::time::Duration;

use crate::ai::gemini::{DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::ai::queue::{QueueOptions, DEFAULT_COOLDOWN, DEFAULT_MAX_RETRIES};

pub struct Config {
    pub discord_token: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ai_channel_id: Option<u64>,
    pub ai_cooldown: Duration,
    pub ai_max_retries: u32,
    pub ai_request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            discord_token: lookup("DISCORD_TOKEN").expect("DISCORD_TOKEN 환경변수가 필요합니다"),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ai_channel_id: parse_var(&lookup, "AI_CHANNEL_ID"),
            ai_cooldown: parse_var(&lookup, "AI_COOLDOWN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_COOLDOWN),
            ai_max_retries: parse_var(&lookup, "AI_MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES),
            ai_request_timeout: parse_var(&lookup, "AI_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            cooldown: self.ai_cooldown,
            default_max_retries: self.ai_max_retries,
            ..QueueOptions::default()
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{key} 값을 해석할 수 없습니다: {value:?}");
            None
        }
    }
}
