//! Outgoing command descriptors.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identifiers::{MessageId, SessionId};

// ============================================================================
// Message
// ============================================================================

/// A command descriptor: protocol method plus its ordered parameters.
///
/// The message carries no ID; the connection assigns one when it sends it,
/// so the same descriptor can be sent more than once.
///
/// # Example
///
/// ```ignore
/// let message = Message::new("Page.navigate").param("url", "https://example.com");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    method: String,
    params: Map<String, Value>,
}

impl Message {
    /// Creates a message with no parameters.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
        }
    }

    /// Creates a message from a ready-made parameter map.
    #[inline]
    #[must_use]
    pub fn with_params(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Appends a parameter, keeping insertion order.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the protocol method, e.g. `Page.navigate`.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the parameters.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Encodes the wire frame for this message under `id`.
    pub(crate) fn encode(&self, id: MessageId, session_id: Option<&SessionId>) -> Result<String> {
        let envelope = Envelope {
            id,
            method: &self.method,
            params: &self.params,
            session_id,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Wire form of a message.
///
/// ```json
/// { "id": 1, "method": "Page.navigate", "params": { "url": "..." }, "sessionId": "..." }
/// ```
#[derive(Serialize)]
struct Envelope<'a> {
    id: MessageId,
    method: &'a str,
    params: &'a Map<String, Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a SessionId>,
}

// ============================================================================
// Tests
// ============================================================================
