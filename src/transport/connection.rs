//! Response correlator and event dispatch.
//!
//! A [`Connection`] owns the transport, allocates message IDs, keeps the
//! table of commands awaiting a reply, and routes events to subscribers.
//!
//! # Send Modes
//!
//! | Method | Returns | Waits |
//! |--------|---------|-------|
//! | [`Connection::send_sync`] | [`Response`] | Pumps until the reply arrives or the transport runs dry |
//! | [`Connection::send_sync_timeout`] | [`Response`] | Pumps on the poll driver until the reply arrives or the budget runs out |
//! | [`Connection::send_deferred`] | [`ResponseReader`] | Never; the reader pumps when polled |
//!
//! A reply with an `error` object is still a reply: it resolves its command
//! normally and the caller turns it into [`Error::ResponseHasError`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{MessageId, SessionId, SubscriptionId};
use crate::options::ConnectionOptions;
use crate::poll::{Clock, TokioClock};
use crate::protocol::{Event, Inbound, Message, Response};

use super::{ResponseReader, Transport, WebSocketTransport};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called synchronously, in arrival order, for each matching event.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// A command awaiting its reply.
struct PendingCommand {
    method: String,
    response: Option<Response>,
}

/// Map of message IDs to commands awaiting a reply.
type PendingTable = FxHashMap<MessageId, PendingCommand>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` subscribes to every event.
    method: Option<String>,
    handler: EventHandler,
}

impl Subscriber {
    fn matches(&self, method: &str) -> bool {
        self.method.as_deref().is_none_or(|m| m == method)
    }
}

struct ConnectionInner {
    transport: AsyncMutex<Box<dyn Transport>>,
    next_id: AtomicU64,
    next_subscription: AtomicU64,
    pending: Mutex<PendingTable>,
    subscribers: Mutex<Vec<Subscriber>>,
    clock: Arc<dyn Clock>,
    options: ConnectionOptions,
}

// ============================================================================
// Connection
// ============================================================================

/// Command/response correlator over a [`Transport`].
///
/// Cloning is cheap; clones share the transport and the pending table.
///
/// # Pending Table
///
/// An entry is created before its message is transmitted and removed when
/// the waiter takes the reply. A reply is accepted once per ID: a second
/// reply for an entry that is already resolved is logged and ignored, and
/// replies for unknown IDs are logged and dropped.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending_count())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a connection over `transport` using the tokio clock.
    #[must_use]
    pub fn new(transport: impl Transport + 'static, options: ConnectionOptions) -> Self {
        Self::with_clock(transport, options, Arc::new(TokioClock))
    }

    /// Creates a connection with an explicit time source.
    #[must_use]
    pub fn with_clock(
        transport: impl Transport + 'static,
        options: ConnectionOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                transport: AsyncMutex::new(Box::new(transport)),
                next_id: AtomicU64::new(1),
                next_subscription: AtomicU64::new(1),
                pending: Mutex::new(PendingTable::default()),
                subscribers: Mutex::new(Vec::new()),
                clock,
                options,
            }),
        }
    }

    /// Connects to a DevTools WebSocket endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::InvalidArgument`] if the URL is not a `ws`/`wss` URL
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(ws_url: &str, options: ConnectionOptions) -> Result<Self> {
        options.validate()?;
        let transport = WebSocketTransport::connect(ws_url, options.read_timeout).await?;
        Ok(Self::new(transport, options))
    }

    /// Returns the connection options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }

    /// Returns the clock used by waits on this connection.
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        &*self.inner.clock
    }

    /// Returns the number of commands awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns the number of live event subscriptions.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Closes the transport and drops every pending command.
    pub async fn close(&self) -> Result<()> {
        self.inner.transport.lock().await.close().await?;

        let dropped = {
            let mut pending = self.inner.pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if dropped > 0 {
            debug!(count = dropped, "Dropped pending commands on close");
        }
        Ok(())
    }
}

// ============================================================================
// Connection - Sending
// ============================================================================

impl Connection {
    /// Sends a message and pumps until its reply arrives.
    ///
    /// # Errors
    ///
    /// - [`Error::NoResponseAvailable`] if a pump finds nothing and the reply
    ///   has not arrived
    /// - [`Error::CannotReadResponse`] / [`Error::InvalidResponse`] from the pump
    pub async fn send_sync(&self, message: &Message) -> Result<Response> {
        self.send_sync_to(message, None).await
    }

    /// Sends a message and waits for its reply for at most `timeout_ms`.
    ///
    /// # Errors
    ///
    /// - [`Error::OperationTimedOut`] if the reply does not arrive in time
    /// - transport errors from the pump
    pub async fn send_sync_timeout(&self, message: &Message, timeout_ms: u64) -> Result<Response> {
        self.send_sync_timeout_to(message, None, timeout_ms).await
    }

    /// Sends a message and returns a deferred handle to its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be transmitted.
    pub async fn send_deferred(&self, message: &Message) -> Result<ResponseReader> {
        self.send_deferred_to(message, None).await
    }

    pub(crate) async fn send_sync_to(
        &self,
        message: &Message,
        session_id: Option<&SessionId>,
    ) -> Result<Response> {
        let id = self.transmit(message, session_id).await?;

        loop {
            if let Some(response) = self.take_response(id) {
                return Ok(response);
            }

            match self.read_data().await {
                Ok(0) => {
                    self.forget(id);
                    return Err(Error::no_response(id, message.method()));
                }
                Ok(_) => {}
                Err(e) => {
                    self.forget(id);
                    return Err(e);
                }
            }
        }
    }

    pub(crate) async fn send_sync_timeout_to(
        &self,
        message: &Message,
        session_id: Option<&SessionId>,
        timeout_ms: u64,
    ) -> Result<Response> {
        let mut reader = self.send_deferred_to(message, session_id).await?;
        reader.wait_for_response(timeout_ms).await?;

        let id = reader.id();
        reader
            .into_response()
            .ok_or_else(|| Error::no_response(id, message.method()))
    }

    pub(crate) async fn send_deferred_to(
        &self,
        message: &Message,
        session_id: Option<&SessionId>,
    ) -> Result<ResponseReader> {
        let id = self.transmit(message, session_id).await?;
        Ok(ResponseReader::new(self.clone(), id, message.method()))
    }

    /// Assigns an ID, registers the pending entry, and writes the frame.
    async fn transmit(&self, message: &Message, session_id: Option<&SessionId>) -> Result<MessageId> {
        let id = MessageId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let frame = message.encode(id, session_id)?;

        // Register before sending so a fast reply always finds its entry.
        {
            let mut pending = self.inner.pending.lock();
            let max = self.inner.options.max_pending;
            if pending.len() >= max {
                warn!(pending = pending.len(), max, "Too many pending commands");
                return Err(Error::connection(format!(
                    "Too many pending commands: {}/{}",
                    pending.len(),
                    max
                )));
            }
            pending.insert(
                id,
                PendingCommand {
                    method: message.method().to_string(),
                    response: None,
                },
            );
        }

        debug!(id = %id, method = %message.method(), "Sending message");

        let sent = self.inner.transport.lock().await.send(frame).await;
        if let Err(e) = sent {
            self.forget(id);
            return Err(e);
        }

        Ok(id)
    }
}

// ============================================================================
// Connection - Pumping
// ============================================================================

impl Connection {
    /// Pumps the transport once, dispatching every available frame.
    ///
    /// Replies resolve their pending entry; events go to every matching
    /// subscriber. Returns the number of frames read.
    ///
    /// # Errors
    ///
    /// - [`Error::CannotReadResponse`] if the transport is unreadable
    /// - [`Error::InvalidResponse`] if a frame is malformed; the other frames
    ///   of the batch are still dispatched
    pub async fn read_data(&self) -> Result<usize> {
        let frames = self.inner.transport.lock().await.read_data().await?;
        let count = frames.len();

        let mut first_error = None;
        for frame in &frames {
            if let Err(e) = self.dispatch(frame) {
                warn!(error = %e, "Failed to dispatch frame");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    fn dispatch(&self, frame: &str) -> Result<()> {
        match Inbound::parse(frame)? {
            Inbound::Response(response) => self.resolve(response),
            Inbound::Event(event) => self.emit(&event),
        }
        Ok(())
    }

    fn resolve(&self, response: Response) {
        let mut pending = self.inner.pending.lock();
        match pending.get_mut(&response.id) {
            Some(entry) if entry.response.is_none() => {
                trace!(id = %response.id, method = %entry.method, "Response received");
                entry.response = Some(response);
            }
            Some(entry) => {
                warn!(id = %response.id, method = %entry.method, "Duplicate response ignored");
            }
            None => {
                warn!(id = %response.id, "Response for unknown message");
            }
        }
    }

    fn emit(&self, event: &Event) {
        let handlers: Vec<EventHandler> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.matches(&event.method))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        trace!(method = %event.method, handlers = handlers.len(), "Event received");

        for handler in handlers {
            handler(event);
        }
    }

    /// Returns `true` if the reply for `id` has arrived and not been taken.
    pub(crate) fn is_resolved(&self, id: MessageId) -> bool {
        self.inner
            .pending
            .lock()
            .get(&id)
            .is_some_and(|entry| entry.response.is_some())
    }

    /// Removes and returns the reply for `id` if it has arrived.
    pub(crate) fn take_response(&self, id: MessageId) -> Option<Response> {
        let mut pending = self.inner.pending.lock();
        if pending.get(&id).is_some_and(|entry| entry.response.is_some()) {
            pending.remove(&id).and_then(|entry| entry.response)
        } else {
            None
        }
    }

    /// Drops the pending entry for `id`; a late reply becomes an orphan.
    pub(crate) fn forget(&self, id: MessageId) {
        if let Some(entry) = self.inner.pending.lock().remove(&id) {
            debug!(id = %id, method = %entry.method, "Abandoned pending command");
        }
    }
}

// ============================================================================
// Connection - Subscriptions
// ============================================================================

impl Connection {
    /// Subscribes to events with the given method name.
    pub fn subscribe(
        &self,
        method: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.add_subscriber(Some(method.into()), Arc::new(handler))
    }

    /// Subscribes to every event.
    pub fn subscribe_all(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        self.add_subscriber(None, Arc::new(handler))
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        before != subscribers.len()
    }

    fn add_subscriber(&self, method: Option<String>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::new(self.inner.next_subscription.fetch_add(1, Ordering::SeqCst));
        debug!(subscription = %id, method = ?method, "Adding event subscriber");
        self.inner.subscribers.lock().push(Subscriber {
            id,
            method,
            handler,
        });
        id
    }
}

// ============================================================================
// Tests
// ============================================================================
