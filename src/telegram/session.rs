use base64::{Engine as _, engine::general_purpose};

use crate::errors::DigestError;

/// Encode serialized session bytes for storage in `TG_SESSION_STRING`.
#[must_use]
pub fn encode_session_bytes(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a `TG_SESSION_STRING` back into session bytes.
///
/// # Errors
///
/// Returns `ConfigError` when the string is empty or not valid base64.
pub fn decode_session_string(raw: &str) -> Result<Vec<u8>, DigestError> {
    let trimmed = raw.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(DigestError::ConfigError(
            "TG_SESSION_STRING is empty".to_string(),
        ));
    }
    general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| DigestError::ConfigError(format!("TG_SESSION_STRING is not valid base64: {e}")))
}
