//! Error types for the DevTools driver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_driver::{Error, Result};
//!
//! async fn example(page: &Page) -> Result<()> {
//!     let navigation = page.navigate("https://example.com").await?;
//!     navigation.wait_for_navigation("load", 30_000).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Communication | [`Error::CannotReadResponse`], [`Error::InvalidResponse`], [`Error::NoResponseAvailable`], [`Error::ResponseHasError`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Waiting | [`Error::OperationTimedOut`], [`Error::NavigationExpired`] |
//! | Evaluation | [`Error::Evaluation`], [`Error::EvaluationRaced`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! The communication category plays the role of a common base type:
//! [`Error::is_communication_error`] tells whether a failure came from the
//! transport or the protocol rather than from local validation or a timeout.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{LoaderId, MessageId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection or page options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument supplied by the caller.
    ///
    /// Returned before any command is sent, e.g. for bad screenshot options.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Communication Errors
    // ========================================================================
    /// The transport could not be read.
    ///
    /// Returned when the socket is closed or a read fails mid-pump.
    #[error("Cannot read response: {message}")]
    CannotReadResponse {
        /// Description of the read failure.
        message: String,
    },

    /// An inbound frame could not be understood.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the malformed frame.
        message: String,
    },

    /// No reply arrived for a blocking send before the transport ran dry.
    #[error("No response available for message {id} ({method})")]
    NoResponseAvailable {
        /// Id of the message left unanswered.
        id: MessageId,
        /// Method of the message left unanswered.
        method: String,
    },

    /// The remote end accepted the message but reported a failure.
    #[error("Response has error: {message}")]
    ResponseHasError {
        /// Message reported by the remote end.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed or the channel refused a message.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket connection closed.
    ///
    /// Returned when sending on a transport that has already shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Waiting Errors
    // ========================================================================
    /// A poll-driven wait exhausted its budget.
    #[error("Operation timed out after {timeout_ms}ms: {operation}")]
    OperationTimedOut {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds of budget that were available.
        timeout_ms: u64,
    },

    /// The main frame moved to a generation other than the one awaited.
    #[error("Navigation expired: expected loader {expected}, frame is on {actual}")]
    NavigationExpired {
        /// Loader the navigation was expected to produce.
        expected: LoaderId,
        /// Loader the frame is actually on.
        actual: String,
    },

    // ========================================================================
    // Evaluation Errors
    // ========================================================================
    /// JavaScript evaluation threw.
    #[error("Evaluation failed: {message}")]
    Evaluation {
        /// Exception description from the page.
        message: String,
    },

    /// The document changed between sending an evaluation and reading it.
    #[error("Evaluation raced a navigation: sent on {sent}, resolved on {resolved}")]
    EvaluationRaced {
        /// Generation in effect when the evaluation was sent.
        sent: String,
        /// Generation in effect when the result was read.
        resolved: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a cannot-read-response error.
    #[inline]
    pub fn cannot_read(message: impl Into<String>) -> Self {
        Self::CannotReadResponse {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[inline]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a no-response-available error.
    #[inline]
    pub fn no_response(id: MessageId, method: impl Into<String>) -> Self {
        Self::NoResponseAvailable {
            id,
            method: method.into(),
        }
    }

    /// Creates a response-has-error error.
    #[inline]
    pub fn response_has_error(message: impl Into<String>) -> Self {
        Self::ResponseHasError {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an operation timeout error.
    #[inline]
    pub fn timed_out(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::OperationTimedOut {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a navigation expired error.
    #[inline]
    pub fn navigation_expired(expected: LoaderId, actual: Option<&LoaderId>) -> Self {
        Self::NavigationExpired {
            expected,
            actual: describe_generation(actual),
        }
    }

    /// Creates an evaluation error.
    #[inline]
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Creates an evaluation raced error.
    #[inline]
    pub fn evaluation_raced(sent: Option<&LoaderId>, resolved: Option<&LoaderId>) -> Self {
        Self::EvaluationRaced {
            sent: describe_generation(sent),
            resolved: describe_generation(resolved),
        }
    }
}

fn describe_generation(loader_id: Option<&LoaderId>) -> String {
    loader_id.map_or_else(|| "<none>".to_string(), ToString::to_string)
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimedOut { .. })
    }

    /// Returns `true` if the failure came from the transport or protocol.
    #[inline]
    #[must_use]
    pub fn is_communication_error(&self) -> bool {
        matches!(
            self,
            Self::CannotReadResponse { .. }
                | Self::InvalidResponse { .. }
                | Self::NoResponseAvailable { .. }
                | Self::ResponseHasError { .. }
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error was raised by local validation.
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::Config { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
