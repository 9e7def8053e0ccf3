//! Transport and response correlation layer.
//!
//! This module handles the channel between the local end (Rust) and the
//! browser's DevTools endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Page / Session      │                         │  Browser        │
//! │                      │        WebSocket        │                 │
//! │  Connection          │◄───────────────────────►│  DevTools       │
//! │  (pending table,     │   ws://host/devtools/…  │  endpoint       │
//! │   subscribers)       │                         │                 │
//! └──────────────────────┘                         └─────────────────┘
//! ```
//!
//! # Pumping
//!
//! Nothing reads the socket in the background. Inbound frames are only
//! observed when a caller pumps: a blocking send, a [`ResponseReader`] poll, or
//! a poll-driver step. One pump drains the frames currently available and
//! dispatches them in arrival order.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Correlator: IDs, pending table, subscribers, pump |
//! | `reader` | Deferred response handle |
//! | `websocket` | WebSocket [`Transport`] |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Correlator and event dispatch.
pub mod connection;

/// Deferred response handle.
pub mod reader;

/// WebSocket transport.
pub mod websocket;

// ============================================================================
// Transport
// ============================================================================

/// A bidirectional frame channel.
///
/// Implementations only move text frames; correlation happens in
/// [`Connection`].
#[async_trait]
pub trait Transport: Send {
    /// Transmits one text frame.
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Performs one pump cycle, returning the frames currently available.
    ///
    /// An empty vector means nothing is available right now. Implementations
    /// must not wait indefinitely for more data.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::CannotReadResponse`] if the channel is closed or
    ///   unreadable
    /// - [`crate::Error::InvalidResponse`] if a frame is not text
    async fn read_data(&mut self) -> Result<Vec<String>>;

    /// Closes the channel.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventHandler};
pub use reader::ResponseReader;
pub use websocket::WebSocketTransport;

#[cfg(test)]
pub(crate) mod mock;
