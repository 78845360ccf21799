//! LLM (Gemini) API client module
//!
//! Encapsulates all LLM API interactions for generating summaries.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::DigestError;
use crate::prompt::SYSTEM_INSTRUCTION;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TEMPERATURE: f64 = 0.3;

/// Every category Gemini lets callers tune. Group chat trips the defaults
/// constantly, so all of them are set to `BLOCK_NONE`.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Finish reasons that mean the output was withheld on content grounds.
const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
];

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// What a single generation request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// No candidates came back and the prompt feedback named a block reason.
    PromptBlocked(String),
    /// Nothing usable came back; carries the finish reason when there was one.
    Empty { finish_reason: Option<String> },
}

/// A model able to turn a prompt into text.
///
/// `key_slot` selects the credential; implementations map it onto their key
/// pool however they like.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn generate(&self, key_slot: usize, prompt: &str) -> Result<Generation, DigestError>;
}

/// True when a finish reason means the content itself was refused.
#[must_use]
pub fn is_safety_finish_reason(reason: &str) -> bool {
    SAFETY_FINISH_REASONS.contains(&reason)
}

/// Build the `generateContent` request body.
#[must_use]
pub fn build_request_body(prompt: &str) -> Value {
    let safety_settings: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "safetySettings": safety_settings,
        "generationConfig": { "temperature": TEMPERATURE },
    })
}

/// Interpret a `generateContent` response body.
#[must_use]
pub fn parse_generation(response: &Value) -> Generation {
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty());

    let Some(first) = candidates.and_then(|c| c.first()) else {
        return match response
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(Value::as_str)
        {
            Some(reason) => Generation::PromptBlocked(reason.to_string()),
            None => Generation::Empty {
                finish_reason: None,
            },
        };
    };

    let text = first
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    let text = text.trim();

    if text.is_empty() {
        return Generation::Empty {
            finish_reason: first
                .get("finishReason")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
    }

    Generation::Text(text.to_string())
}

/// LLM API client for generating summaries
pub struct LlmClient {
    api_keys: Vec<String>,
    model_name: String,
    http: Client,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error when no API key is given or the HTTP client cannot be built.
    pub fn new(api_keys: Vec<String>, model_name: String) -> Result<Self, DigestError> {
        if api_keys.is_empty() {
            return Err(DigestError::ConfigError(
                "at least one Gemini API key is required".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                DigestError::HttpError(format!("Failed to build Gemini HTTP client: {e}"))
            })?;

        Ok(Self {
            api_keys,
            model_name,
            http,
        })
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.api_keys.len()
    }

    fn key_for_slot(&self, slot: usize) -> &str {
        &self.api_keys[slot % self.key_count()]
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_BASE_URL}/{}:generateContent", self.model_name)
    }
}

#[async_trait]
impl SummaryModel for LlmClient {
    async fn generate(&self, key_slot: usize, prompt: &str) -> Result<Generation, DigestError> {
        #[cfg(feature = "debug-logs")]
        info!("Using Gemini prompt:\n{}", prompt);

        info!(
            "Requesting summary from {} (key {} of {}, ~{} input tokens)",
            self.model_name,
            key_slot % self.key_count() + 1,
            self.key_count(),
            estimate_tokens(prompt)
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.key_for_slot(key_slot))
            .json(&build_request_body(prompt))
            .send()
            .await
            .map_err(|e| DigestError::HttpError(format!("Gemini API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            warn!("Gemini returned status {}", status);
            return Err(DigestError::GeminiError(format!(
                "Gemini API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| DigestError::GeminiError(format!("Failed to parse Gemini response: {e}")))?;

        Ok(parse_generation(&response_json))
    }
}
