//! Event message types.
//!
//! Events are notifications pushed by the remote end without a command ID.
//! Only the events the page layer tracks get typed variants.
//!
//! # Event Types
//!
//! | Method | Variant |
//! |--------|---------|
//! | `Page.frameNavigated` | [`PageEvent::FrameNavigated`] |
//! | `Page.lifecycleEvent` | [`PageEvent::Lifecycle`] |
//! | `Page.navigatedWithinDocument` | [`PageEvent::NavigatedWithinDocument`] |
//! | `Page.frameStartedLoading` | [`PageEvent::FrameStartedLoading`] |
//! | `Page.frameStoppedLoading` | [`PageEvent::FrameStoppedLoading`] |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, LoaderId, SessionId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the remote end.
///
/// # Format
///
/// ```json
/// { "method": "Page.lifecycleEvent", "params": { ... }, "sessionId": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session the event belongs to, for flat sessions.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

impl Event {
    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "Page.lifecycleEvent".into(), .. };
    /// assert_eq!(event.domain(), "Page");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if a tracked event carries params
    /// that do not match its schema.
    pub fn parse(&self) -> Result<PageEvent> {
        match self.method.as_str() {
            "Page.frameNavigated" => {
                let params: FrameNavigatedParams = self.params_as()?;
                Ok(PageEvent::FrameNavigated {
                    frame_id: params.frame.id,
                    parent_id: params.frame.parent_id,
                    loader_id: params.frame.loader_id,
                    url: params.frame.url,
                })
            }
            "Page.lifecycleEvent" => {
                let params: LifecycleParams = self.params_as()?;
                Ok(PageEvent::Lifecycle {
                    frame_id: params.frame_id,
                    loader_id: params.loader_id,
                    name: params.name,
                    timestamp: params.timestamp,
                })
            }
            "Page.navigatedWithinDocument" => {
                let params: WithinDocumentParams = self.params_as()?;
                Ok(PageEvent::NavigatedWithinDocument {
                    frame_id: params.frame_id,
                    url: params.url,
                })
            }
            "Page.frameStartedLoading" => {
                let params: FrameParams = self.params_as()?;
                Ok(PageEvent::FrameStartedLoading {
                    frame_id: params.frame_id,
                })
            }
            "Page.frameStoppedLoading" => {
                let params: FrameParams = self.params_as()?;
                Ok(PageEvent::FrameStoppedLoading {
                    frame_id: params.frame_id,
                })
            }
            _ => Ok(PageEvent::Other),
        }
    }

    fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.params).map_err(|e| {
            Error::invalid_response(format!("malformed {} params: {e}", self.method))
        })
    }
}

// ============================================================================
// PageEvent
// ============================================================================

/// Parsed page events for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// A frame committed a navigation.
    FrameNavigated {
        /// Frame that navigated.
        frame_id: FrameId,
        /// Parent frame (None for the main frame).
        parent_id: Option<FrameId>,
        /// Loader of the committed document.
        loader_id: LoaderId,
        /// Document URL.
        url: String,
    },

    /// A lifecycle milestone such as `init`, `DOMContentLoaded` or `load`.
    Lifecycle {
        /// Frame the milestone belongs to.
        frame_id: FrameId,
        /// Loader the milestone belongs to.
        loader_id: LoaderId,
        /// Milestone name.
        name: String,
        /// Monotonic browser timestamp in seconds.
        timestamp: f64,
    },

    /// Fragment or history API navigation inside the same document.
    NavigatedWithinDocument {
        /// Frame that navigated.
        frame_id: FrameId,
        /// New URL.
        url: String,
    },

    /// Frame started loading.
    FrameStartedLoading {
        /// Frame that started loading.
        frame_id: FrameId,
    },

    /// Frame stopped loading.
    FrameStoppedLoading {
        /// Frame that stopped loading.
        frame_id: FrameId,
    },

    /// Any event the page layer does not track.
    Other,
}

// ============================================================================
// Param Schemas
// ============================================================================

#[derive(Deserialize)]
struct FrameNavigatedParams {
    frame: FramePayload,
}

/// Frame object as reported by `Page.frameNavigated` and `Page.getFrameTree`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FramePayload {
    pub id: FrameId,
    #[serde(rename = "parentId", default)]
    pub parent_id: Option<FrameId>,
    #[serde(rename = "loaderId")]
    pub loader_id: LoaderId,
    #[serde(default)]
    pub url: String,
}

impl FramePayload {
    /// Decodes a frame object.
    pub(crate) fn deserialize_from(value: &Value) -> Result<Self> {
        Self::deserialize(value)
            .map_err(|e| Error::invalid_response(format!("malformed frame: {e}")))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleParams {
    frame_id: FrameId,
    loader_id: LoaderId,
    name: String,
    #[serde(default)]
    timestamp: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithinDocumentParams {
    frame_id: FrameId,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameParams {
    frame_id: FrameId,
}

// ============================================================================
// Tests
// ============================================================================
