use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to access Telegram API: {0}")]
    TelegramError(String),

    #[error("Telegram rejected the write: {0}")]
    WriteForbidden(String),

    #[error("Failed to access Gemini API: {0}")]
    GeminiError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("{0}")]
    GeneralError(String),
}

impl DigestError {
    /// True when the platform refused to let this account post in the chat.
    #[must_use]
    pub fn is_write_forbidden(&self) -> bool {
        matches!(self, DigestError::WriteForbidden(_))
    }
}

impl From<reqwest::Error> for DigestError {
    fn from(error: reqwest::Error) -> Self {
        DigestError::HttpError(error.to_string())
    }
}

impl From<anyhow::Error> for DigestError {
    fn from(error: anyhow::Error) -> Self {
        DigestError::GeneralError(error.to_string())
    }
}
