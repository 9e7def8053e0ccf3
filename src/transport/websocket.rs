//! WebSocket transport to a DevTools endpoint.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

use super::Transport;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// [`Transport`] over a DevTools WebSocket.
///
/// A pump waits up to `read_timeout` for the first frame, then takes every
/// further frame that is already buffered without waiting again.
///
/// A failure after some frames were read ends the pump early: the frames
/// read so far are returned and the failure is reported by the next pump.
pub struct WebSocketTransport {
    stream: WsStream,
    read_timeout: Duration,
    closed: bool,
    deferred: Option<Error>,
}

impl WebSocketTransport {
    /// Connects to a `ws://` or `wss://` endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the URL is malformed or not a WebSocket URL
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(ws_url: &str, read_timeout: Duration) -> Result<Self> {
        let url = parse_endpoint(ws_url)?;
        debug!(url = %url, "Connecting to DevTools endpoint");

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(format!("{url}: {e}")))?;

        debug!(url = %url, "DevTools WebSocket established");

        Ok(Self {
            stream,
            read_timeout,
            closed: false,
            deferred: None,
        })
    }

    /// Sorts one stream item into `frames`.
    fn accept(
        &mut self,
        item: Option<std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>,
        frames: &mut Vec<String>,
    ) -> Result<()> {
        match item {
            Some(Ok(WsMessage::Text(text))) => {
                frames.push(text.as_str().to_owned());
                Ok(())
            }
            Some(Ok(WsMessage::Binary(bytes))) => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| Error::invalid_response("binary frame is not UTF-8"))?;
                frames.push(text);
                Ok(())
            }
            Some(Ok(WsMessage::Close(_))) | None => {
                debug!("WebSocket closed by remote");
                self.closed = true;
                Ok(())
            }
            Some(Err(e)) => {
                self.closed = true;
                Err(Error::cannot_read(e.to_string()))
            }
            // Ping, Pong, raw frames
            Some(Ok(_)) => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        trace!(len = frame.len(), "Sending frame");
        self.stream.send(WsMessage::Text(frame.into())).await?;
        Ok(())
    }

    async fn read_data(&mut self) -> Result<Vec<String>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if self.closed {
            return Err(Error::cannot_read("WebSocket connection is closed"));
        }

        let mut frames = Vec::new();

        let first = match timeout(self.read_timeout, self.stream.next()).await {
            Ok(item) => item,
            Err(_) => return Ok(frames),
        };
        self.accept(first, &mut frames)?;

        while !self.closed {
            let Some(item) = self.stream.next().now_or_never() else {
                break;
            };
            if let Err(err) = self.accept(item, &mut frames) {
                if frames.is_empty() {
                    return Err(err);
                }
                debug!(error = %err, count = frames.len(), "Pump failed mid-batch");
                self.deferred = Some(err);
                break;
            }
        }

        // Frames read before a close are still delivered; the next pump fails.
        if self.closed && frames.is_empty() {
            return Err(self
                .deferred
                .take()
                .unwrap_or_else(|| Error::cannot_read("WebSocket connection is closed")));
        }

        trace!(count = frames.len(), "Pumped frames");
        Ok(frames)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.stream.close(None).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Validates a DevTools endpoint URL.
pub(crate) fn parse_endpoint(ws_url: &str) -> Result<Url> {
    let url = Url::parse(ws_url)
        .map_err(|e| Error::invalid_argument(format!("invalid endpoint {ws_url:?}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::invalid_argument(format!(
            "endpoint must use ws or wss, got {other}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
