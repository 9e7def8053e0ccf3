//! Deferred response handle.
//!
//! A [`ResponseReader`] is returned by deferred sends. It does not wait on
//! creation; each [`ResponseReader::poll`] pumps the transport at most once.
//! Once resolved, the reply is cached on the handle and later polls return it
//! without touching the transport again.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::identifiers::MessageId;
use crate::poll::{PollStep, Step, poll_until, timeout_from_millis};
use crate::protocol::Response;

use super::Connection;

// ============================================================================
// ResponseReader
// ============================================================================

/// Handle to the reply of a command sent without waiting.
///
/// Dropping an unresolved reader abandons its pending entry; a reply that
/// arrives afterwards is treated as an orphan.
#[derive(Debug)]
pub struct ResponseReader {
    connection: Connection,
    id: MessageId,
    method: String,
    response: Option<Response>,
}

impl ResponseReader {
    pub(crate) fn new(connection: Connection, id: MessageId, method: &str) -> Self {
        Self {
            connection,
            id,
            method: method.to_string(),
            response: None,
        }
    }

    /// Returns the message ID of the command.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the method name of the command.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the cached reply without pumping.
    #[inline]
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns `true` if the reply is cached or already sitting in the
    /// pending table. Never pumps.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.response.is_some() || self.connection.is_resolved(self.id)
    }

    /// Checks for the reply, pumping the transport at most once.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the pump.
    pub async fn poll(&mut self) -> Result<Option<&Response>> {
        if self.response.is_none() {
            self.collect();
        }
        if self.response.is_none() {
            self.connection.read_data().await?;
            self.collect();
        }
        Ok(self.response.as_ref())
    }

    /// Waits for the reply for at most `timeout_ms`.
    ///
    /// # Errors
    ///
    /// - [`Error::OperationTimedOut`] if the reply does not arrive in time
    /// - transport errors from the pump
    pub async fn wait_for_response(&mut self, timeout_ms: u64) -> Result<&Response> {
        if self.response.is_none() {
            let connection = self.connection.clone();
            let operation = format!("wait for {} response (id {})", self.method, self.id);
            let mut step = ResponseWait {
                interval: connection.options().response_poll_interval,
                reader: self,
            };
            poll_until(
                &mut step,
                timeout_from_millis(timeout_ms),
                connection.clock(),
                &operation,
            )
            .await?;
        }

        self.response
            .as_ref()
            .ok_or_else(|| Error::no_response(self.id, &self.method))
    }

    /// Consumes the reader, returning the cached reply if there is one.
    #[must_use]
    pub fn into_response(mut self) -> Option<Response> {
        self.response.take()
    }

    fn collect(&mut self) {
        if let Some(response) = self.connection.take_response(self.id) {
            self.response = Some(response);
        }
    }
}

impl Drop for ResponseReader {
    fn drop(&mut self) {
        if self.response.is_none() {
            self.connection.forget(self.id);
        }
    }
}

// ============================================================================
// ResponseWait
// ============================================================================

struct ResponseWait<'a> {
    reader: &'a mut ResponseReader,
    interval: Duration,
}

#[async_trait]
impl<'a> PollStep for ResponseWait<'a> {
    type Output = ();

    async fn step(&mut self) -> Result<Step<()>> {
        if self.reader.poll().await?.is_some() {
            Ok(Step::Done(()))
        } else {
            Ok(Step::Continue(self.interval))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
