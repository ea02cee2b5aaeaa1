//! Error types for the planner client.
//!
//! # Design
//! `Unauthorized` and `NotFound` get dedicated variants because callers
//! branch on them: a 401 ends the session and must never be retried, a 404
//! usually means a record was deleted elsewhere. Every other non-2xx response
//! lands in `HttpError` with the raw status and body plus the message the
//! server put in the body, if any.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by the request builder, the transports and every layer
/// above them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 401. Terminal: the session is gone.
    #[error("unauthorized")]
    Unauthorized { message: Option<String> },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound { message: Option<String> },

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
        message: Option<String>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response (connection refused, timeout...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// A draft was rejected locally; no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Whether a failed read may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_)
                | ApiError::HttpError { .. }
                | ApiError::NotFound { .. }
                | ApiError::DeserializationError(_)
        )
    }

    /// The message the server reported in its error body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::NotFound { message }
            | ApiError::HttpError { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show to the user: local validation messages verbatim, the
    /// server's message when it sent one, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Validation(err) => err.to_string(),
            other => other
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Local validation failures, detected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("End date cannot be before start date")]
    EndDateBeforeStartDate,

    #[error("End time must be equal to or after start time")]
    EndTimeBeforeStartTime,
}

/// Pull a human-readable message out of a JSON error body.
///
/// Looks at `message`, then `errors[].msg` (joined with ", "), then `error`.
pub fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }

    if let Some(errors) = value.get("errors").and_then(|e| e.as_array()) {
        let joined = errors
            .iter()
            .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        if !joined.is_empty() {
            return Some(joined);
        }
    }

    value
        .get("error")
        .and_then(|e| e.as_str())
        .map(str::to_string)
}
