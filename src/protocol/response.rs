//! Command responses.
//!
//! # Format
//!
//! Success:
//! ```json
//! { "id": 1, "result": { "frameId": "...", "loaderId": "..." } }
//! ```
//!
//! Error:
//! ```json
//! { "id": 1, "error": { "code": -32000, "message": "Cannot navigate to invalid URL" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{MessageId, SessionId};

// ============================================================================
// Response
// ============================================================================

/// A reply from the remote end, matched to a command by `id`.
///
/// An unsuccessful response is still a response: the correlator hands it to
/// the waiter unchanged and the caller decides how to surface the error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Matches the command `id`.
    pub id: MessageId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error details (if error).
    #[serde(default)]
    pub error: Option<ResponseError>,

    /// Session the reply belongs to, for flat sessions.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Error object carried by an unsuccessful response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseError {
    /// Protocol error code.
    #[serde(default)]
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional extra detail.
    #[serde(default)]
    pub data: Option<Value>,
}

impl Response {
    /// Returns `true` if the remote end reported success.
    #[inline]
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the error message, if the response is an error.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Returns a top-level field of the result.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.as_ref().and_then(|v| v.get(key))
    }

    /// Returns a top-level string field of the result.
    #[inline]
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseHasError`] if the response was an error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(error) => Err(Error::response_has_error(error.message)),
        }
    }

    /// Fails with [`Error::ResponseHasError`] if the response was an error.
    pub fn ensure_successful(&self) -> Result<&Self> {
        match self.error_message() {
            None => Ok(self),
            Some(message) => Err(Error::response_has_error(message)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
