//! Response envelope handling.
//!
//! Backend responses may be wrapped in `{status, message, data, errors}`
//! or delivered as the bare payload, depending on the endpoint. Success
//! payloads unwrap `data` when present and otherwise parse the body
//! directly; error text prefers `errors[0].message`, then `message`.

// Allow dead code: envelope structs mirror the wire shape
#![allow(dead_code)]

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
}

impl<T> Envelope<T> {
    fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }

    fn error_text(&self) -> Option<String> {
        self.errors
            .iter()
            .map(|e| e.message.clone())
            .find(|m| !m.is_empty())
            .or_else(|| self.message.clone())
            .filter(|m| !m.is_empty())
    }
}

/// Parse a successful response body, unwrapping the envelope if one is
/// present.
pub(crate) fn parse_payload<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    // Try the envelope shape first
    if let Ok(envelope) = serde_json::from_str::<Envelope<T>>(body) {
        if envelope.is_error() {
            let message = envelope
                .error_text()
                .unwrap_or_else(|| "request rejected by server".to_string());
            return Err(ApiError::Server(message));
        }
        if let Some(data) = envelope.data {
            return Ok(data);
        }
    }

    // Fall back to the bare payload
    serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Extract the user-visible error text from a (possibly enveloped)
/// error body, if any.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body).ok()?;
    envelope.error_text()
}
