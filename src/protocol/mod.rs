//! DevTools protocol message types.
//!
//! This module defines the frames exchanged between the local end (Rust)
//! and the remote end (browser).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Message` | Local → Remote | Command, assigned an ID at send time |
//! | `Response` | Remote → Local | Reply correlated by ID |
//! | `Event` | Remote → Local | Unsolicited notification |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Command descriptor and wire envelope |
//! | `response` | Reply and error object |
//! | `event` | Event and typed page events |
//! | `inbound` | Classification of inbound frames |

// ============================================================================
// Submodules
// ============================================================================

/// Event message types.
pub mod event;

/// Inbound frame classification.
pub mod inbound;

/// Outgoing command descriptors.
pub mod message;

/// Replies to commands.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{Event, PageEvent};
pub use inbound::Inbound;
pub use message::Message;
pub use response::{Response, ResponseError};
