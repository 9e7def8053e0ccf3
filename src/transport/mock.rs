//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Error, Result};

use super::Transport;

/// Produces reply frames for a sent command, given its ID and params.
type Responder = Arc<dyn Fn(u64, &Value) -> Vec<String> + Send + Sync>;

#[derive(Default)]
struct MockState {
    inbound: VecDeque<String>,
    sent: Vec<Value>,
    reads: usize,
    responders: FxHashMap<String, Responder>,
    read_failure: Option<String>,
    closed: bool,
}

/// Scripted [`Transport`]. Clones share state, so a test keeps one clone
/// while the connection owns another.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues a frame for the next pump.
    pub(crate) fn push(&self, frame: impl Into<String>) {
        self.state.lock().inbound.push_back(frame.into());
    }

    /// Replies to every future `method` command with the frames `responder`
    /// builds.
    pub(crate) fn respond_to(
        &self,
        method: &str,
        responder: impl Fn(u64, &Value) -> Vec<String> + Send + Sync + 'static,
    ) {
        self.state
            .lock()
            .responders
            .insert(method.to_string(), Arc::new(responder));
    }

    /// Makes every following pump fail.
    pub(crate) fn fail_reads(&self, message: &str) {
        self.state.lock().read_failure = Some(message.to_string());
    }

    /// Frames sent so far, decoded.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.state.lock().sent.clone()
    }

    /// Methods sent so far, in order.
    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter_map(|v| v["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Number of pumps performed.
    pub(crate) fn reads(&self) -> usize {
        self.state.lock().reads
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::ConnectionClosed);
        }

        let value: Value = serde_json::from_str(&frame)?;
        let id = value["id"].as_u64().unwrap_or_default();
        let responder = value["method"]
            .as_str()
            .and_then(|m| state.responders.get(m))
            .cloned();

        if let Some(responder) = responder {
            let frames = responder(id, &value["params"]);
            state.inbound.extend(frames);
        }
        state.sent.push(value);
        Ok(())
    }

    async fn read_data(&mut self) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.reads += 1;
        if let Some(message) = &state.read_failure {
            return Err(Error::cannot_read(message.clone()));
        }
        Ok(state.inbound.drain(..).collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
