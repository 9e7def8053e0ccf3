//! DevTools driver - command correlation and page lifecycle tracking.
//!
//! This library drives a browser page over a Chrome DevTools Protocol style
//! WebSocket: commands go out with a unique ID, replies come back matched to
//! that ID, and events arrive in between.
//!
//! # Architecture
//!
//! - **Correlator**: [`Connection`] assigns IDs, keeps the pending table and
//!   routes events to subscribers
//! - **Pump**: inbound frames are read only while an operation is being
//!   awaited (blocking send, [`ResponseReader`] poll, poll-driver step)
//! - **Tracker**: [`FrameManager`] follows the main frame's loader generation
//!   and the lifecycle milestones recorded under it
//! - **Poll driver**: [`poll::poll_until`] bounds every wait by a timeout
//!
//! Key design principles:
//!
//! - No background tasks; the caller's task does all the reading
//! - Lifecycle events from a replaced generation never satisfy a wait
//! - Result handles hold a generation snapshot, never the page itself
//! - Every public timeout is in milliseconds
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_driver::{Connection, ConnectionOptions, Page, PageOptions, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = Connection::connect(
//!         "ws://127.0.0.1:9222/devtools/page/ABC",
//!         ConnectionOptions::new(),
//!     )
//!     .await?;
//!     let page = Page::attach(Session::new(connection), PageOptions::new()).await?;
//!
//!     let navigation = page.navigate("https://example.com").await?;
//!     navigation.wait_for_navigation("load", 30_000).await?;
//!
//!     let title = page.evaluate("document.title").await?.wait_for_result(5_000).await?;
//!     println!("Page title: {}", title.value_if_current()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`options`] | Connection and page configuration |
//! | [`page`] | Page façade: [`Page`], navigation, evaluation, screenshots |
//! | [`poll`] | Timeout-bounded poll driver |
//! | [`protocol`] | Wire message types |
//! | [`session`] | Target sessions over a connection |
//! | [`transport`] | Transport trait, WebSocket transport, correlator |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Connection and page configuration.
pub mod options;

/// Page façade.
pub mod page;

/// Timeout-bounded cooperative polling.
pub mod poll;

/// Wire message types.
///
/// Commands, replies, and events exchanged with the DevTools endpoint.
pub mod protocol;

/// Target sessions.
pub mod session;

/// Transport layer.
///
/// Frame channel abstraction and the response correlator.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, LoaderId, MessageId, SessionId, SubscriptionId};

// Configuration
pub use options::{ConnectionOptions, PageOptions};

// Page types
pub use page::{
    Clip, EvaluationHandle, EvaluationResult, FrameManager, ImageFormat, LifecycleMap,
    LifecycleSnapshot, LoaderWatch, NavigationHandle, Page, ScreenshotHandle, ScreenshotOptions,
};

// Polling
pub use poll::{Clock, PollStep, Step, TokioClock};

// Protocol types
pub use protocol::{Event, Message, PageEvent, Response, ResponseError};

// Session
pub use session::Session;

// Transport types
pub use transport::{Connection, EventHandler, ResponseReader, Transport, WebSocketTransport};
