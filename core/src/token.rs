//! Bearer token payload decoding.
//!
//! The client never verifies signatures; it only reads the payload to know
//! who the token belongs to and when it stops being valid. `exp` is seconds
//! since the epoch and is compared as `exp * 1000` against wall-clock
//! milliseconds.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not in header.payload.signature form")]
    Malformed,

    #[error("token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Expired when `exp * 1000` is at or before `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.exp.saturating_mul(1000) <= now_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }
}

pub fn decode(token: &str) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };
    if payload.is_empty() {
        return Err(TokenError::Malformed);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
