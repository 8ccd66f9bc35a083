use reqwest::StatusCode;
use thiserror::Error;

use super::envelope;

/// Error type for backend calls.
///
/// Variants carry plain strings rather than source errors so the type
/// is `Clone` - a refresh outcome is fanned out to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired - please sign in again")]
    TokenExpired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Secure storage unavailable: {0}")]
    Storage(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Map an unsuccessful HTTP response to an error, preferring the
    /// server-provided message from the response envelope as the
    /// user-visible text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message =
            envelope::error_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            500..=599 => ApiError::Server(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<crate::auth::StoreError> for ApiError {
    fn from(err: crate::auth::StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}
