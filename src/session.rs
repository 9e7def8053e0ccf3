//! Target sessions over a shared connection.
//!
//! A [`Session`] owns a handle to a [`Connection`] and, for flat session
//! multiplexing, the target's session ID. Every message sent through the
//! session is stamped with that ID, and its subscriptions only see events
//! carrying the same ID.
//!
//! A session without an ID addresses the endpoint the connection was opened
//! on, which is the usual case for a `devtools/page/<id>` URL.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::{SessionId, SubscriptionId};
use crate::protocol::{Event, Message, Response};
use crate::transport::{Connection, ResponseReader};

// ============================================================================
// Session
// ============================================================================

/// A connection bound to one target.
#[derive(Debug, Clone)]
pub struct Session {
    connection: Connection,
    session_id: Option<SessionId>,
}

impl Session {
    /// Creates a session addressing the connection's own endpoint.
    #[inline]
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            session_id: None,
        }
    }

    /// Creates a session for an attached target.
    #[inline]
    #[must_use]
    pub fn with_session_id(connection: Connection, session_id: SessionId) -> Self {
        Self {
            connection,
            session_id: Some(session_id),
        }
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the session ID, if any.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }
}

// ============================================================================
// Session - Sending
// ============================================================================

impl Session {
    /// Sends a message and pumps until its reply arrives.
    ///
    /// See [`Connection::send_sync`].
    pub async fn send_sync(&self, message: &Message) -> Result<Response> {
        self.connection
            .send_sync_to(message, self.session_id.as_ref())
            .await
    }

    /// Sends a message and waits for its reply for at most `timeout_ms`.
    ///
    /// See [`Connection::send_sync_timeout`].
    pub async fn send_sync_timeout(&self, message: &Message, timeout_ms: u64) -> Result<Response> {
        self.connection
            .send_sync_timeout_to(message, self.session_id.as_ref(), timeout_ms)
            .await
    }

    /// Sends a message without waiting.
    ///
    /// See [`Connection::send_deferred`].
    pub async fn send_deferred(&self, message: &Message) -> Result<ResponseReader> {
        self.connection
            .send_deferred_to(message, self.session_id.as_ref())
            .await
    }

    /// Pumps the connection once.
    pub async fn read_data(&self) -> Result<usize> {
        self.connection.read_data().await
    }
}

// ============================================================================
// Session - Subscriptions
// ============================================================================

impl Session {
    /// Subscribes to `method` events belonging to this session.
    pub fn subscribe(
        &self,
        method: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let session_id = self.session_id.clone();
        self.connection.subscribe(method, move |event| {
            if event.session_id == session_id {
                handler(event);
            }
        })
    }

    /// Subscribes to every event belonging to this session.
    pub fn subscribe_all(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        let session_id = self.session_id.clone();
        self.connection.subscribe_all(move |event| {
            if event.session_id == session_id {
                handler(event);
            }
        })
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.connection.unsubscribe(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
