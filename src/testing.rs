//! Unit test support: a virtual clock and frame builders.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::poll::Clock;

// ============================================================================
// FakeClock
// ============================================================================

type SleepHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Virtual [`Clock`]: `sleep` returns at once and advances `now`.
pub(crate) struct FakeClock {
    base: Instant,
    slept: Mutex<Vec<Duration>>,
    hook: Mutex<Option<SleepHook>>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        Self {
            base: Instant::now(),
            slept: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    /// Runs `hook` after every sleep with the 1-based sleep count.
    pub(crate) fn on_sleep(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub(crate) fn total_slept(&self) -> Duration {
        self.slept.lock().iter().sum()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.total_slept()
    }

    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut slept = self.slept.lock();
            slept.push(duration);
            slept.len()
        };
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(count);
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

pub(crate) fn ok_frame(id: u64, result: Value) -> String {
    json!({"id": id, "result": result}).to_string()
}

pub(crate) fn error_frame(id: u64, message: &str) -> String {
    json!({"id": id, "error": {"code": -32000, "message": message}}).to_string()
}

pub(crate) fn event_frame(method: &str, params: Value) -> String {
    json!({"method": method, "params": params}).to_string()
}

pub(crate) fn lifecycle(frame_id: &str, loader_id: &str, name: &str, timestamp: f64) -> String {
    event_frame(
        "Page.lifecycleEvent",
        json!({"frameId": frame_id, "loaderId": loader_id, "name": name, "timestamp": timestamp}),
    )
}

pub(crate) fn frame_navigated(frame_id: &str, loader_id: &str, url: &str) -> String {
    event_frame(
        "Page.frameNavigated",
        json!({"frame": {"id": frame_id, "loaderId": loader_id, "url": url}, "type": "Navigation"}),
    )
}

/// `Page.getFrameTree` result for a single main frame.
pub(crate) fn frame_tree(frame_id: &str, loader_id: &str, url: &str) -> Value {
    json!({"frameTree": {"frame": {"id": frame_id, "loaderId": loader_id, "url": url}}})
}
