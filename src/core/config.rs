use std::env;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::models::TargetGroup;
use crate::errors::DigestError;
use crate::worker::retry::RetryPolicy;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Hong_Kong;
pub const DEFAULT_SUMMARY_LANGUAGE: &str = "Simplified Chinese";
pub const DEFAULT_FALLBACK_MESSAGES: usize = 500;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tg_api_id: i32,
    pub tg_api_hash: String,
    pub tg_session_string: String,
    pub gemini_api_keys: Vec<String>,
    pub gemini_model: String,
    pub target_group: TargetGroup,
    pub test_mode: bool,
    pub topic_filter: Option<String>,
    pub ignored_topics: Vec<String>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub display_timezone: Tz,
    pub summary_language: String,
    pub vip_speakers: Vec<String>,
    /// Size of the reduced-input retry; `None` disables it.
    pub fallback_messages: Option<usize>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first missing or malformed variable.
    pub fn from_env() -> Result<Self, DigestError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first missing or malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DigestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DigestError::ConfigError(format!("{name} is required")))
        };
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let tg_api_id = require("TG_API_ID")?
            .trim()
            .parse::<i32>()
            .map_err(|e| DigestError::ConfigError(format!("TG_API_ID: {e}")))?;

        let gemini_api_keys = split_list(&require("GEMINI_API_KEY")?);
        if gemini_api_keys.is_empty() {
            return Err(DigestError::ConfigError(
                "GEMINI_API_KEY contains no keys".to_string(),
            ));
        }

        let display_timezone = match optional("DISPLAY_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| DigestError::ConfigError(format!("DISPLAY_TIMEZONE: {e}")))?,
            None => DEFAULT_TIMEZONE,
        };

        let last_run_at = optional("LAST_RUN_AT")
            .map(|raw| {
                parse_last_run(&raw).ok_or_else(|| {
                    DigestError::ConfigError(format!("LAST_RUN_AT: cannot parse '{raw}'"))
                })
            })
            .transpose()?;

        let fallback_messages = match optional("FALLBACK_MESSAGES") {
            Some(raw) => {
                let n = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| DigestError::ConfigError(format!("FALLBACK_MESSAGES: {e}")))?;
                (n > 0).then_some(n)
            }
            None => Some(DEFAULT_FALLBACK_MESSAGES),
        };

        Ok(Self {
            tg_api_id,
            tg_api_hash: require("TG_API_HASH")?,
            tg_session_string: require("TG_SESSION_STRING")?,
            gemini_api_keys,
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            target_group: parse_target_group(&require("TARGET_GROUP")?)?,
            test_mode: parse_bool(lookup("TEST_MODE").as_deref(), true),
            topic_filter: optional("TOPIC_FILTER"),
            ignored_topics: optional("IGNORED_TOPICS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            last_run_at,
            display_timezone,
            summary_language: optional("SUMMARY_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_SUMMARY_LANGUAGE.to_string()),
            vip_speakers: optional("VIP_SPEAKERS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            fallback_messages,
        })
    }
}

/// Pagination, chunking and pacing knobs for a run.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub topic_page_size: usize,
    pub message_page_size: usize,
    /// Hard cap on search pages per topic scope.
    pub max_pages: usize,
    pub max_messages_per_topic: usize,
    /// Topics above this many messages are summarized chunk by chunk.
    pub chunk_threshold: usize,
    pub chunk_size: usize,
    /// Pause between chunk requests and before the combining request.
    pub chunk_delay: Duration,
    pub fallback_messages: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            topic_page_size: 50,
            message_page_size: 100,
            max_pages: 50,
            max_messages_per_topic: 5000,
            chunk_threshold: 1000,
            chunk_size: 1000,
            chunk_delay: Duration::from_secs(2),
            fallback_messages: Some(DEFAULT_FALLBACK_MESSAGES),
            retry: RetryPolicy::default(),
        }
    }
}

impl DigestSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fallback_messages: config.fallback_messages,
            ..Self::default()
        }
    }
}

/// Interpret common truthy spellings; anything else is false.
#[must_use]
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
    }
}

/// Accept a username, a `t.me` link, or a numeric chat id.
///
/// Negative ids without the `-100` channel marker get it added.
///
/// # Errors
///
/// Returns `ConfigError` for an empty value.
pub fn parse_target_group(raw: &str) -> Result<TargetGroup, DigestError> {
    let stripped = raw.trim();
    if stripped.is_empty() {
        return Err(DigestError::ConfigError("TARGET_GROUP is empty".to_string()));
    }

    let digits = stripped.trim_start_matches('-');
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        let value = stripped
            .parse::<i64>()
            .map_err(|e| DigestError::ConfigError(format!("TARGET_GROUP: {e}")))?;
        if value < 0 && !stripped.starts_with("-100") {
            let marked = format!("-100{digits}")
                .parse::<i64>()
                .map_err(|e| DigestError::ConfigError(format!("TARGET_GROUP: {e}")))?;
            return Ok(TargetGroup::Id(marked));
        }
        return Ok(TargetGroup::Id(value));
    }

    let name = stripped
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("t.me/")
        .trim_start_matches('@')
        .trim_end_matches('/');
    Ok(TargetGroup::Username(name.to_string()))
}

/// Split a comma-separated value, dropping blanks.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 3339 or unix seconds.
#[must_use]
pub fn parse_last_run(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}
