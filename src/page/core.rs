//! Page struct, attach, and lifecycle queries.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, LoaderId};
use crate::options::PageOptions;
use crate::protocol::Message;
use crate::protocol::event::FramePayload;
use crate::session::Session;

use super::frames::{FrameManager, LifecycleMap, LifecycleSnapshot, LoaderWatch, TrackerFeed};

// ============================================================================
// Page
// ============================================================================

/// A page target driven over a [`Session`].
///
/// The page keeps a lifecycle tracker for its main frame, fed by a
/// subscription on the session. The tracker only advances while something
/// pumps the connection. The subscription ends once the page and every
/// handle created from it are dropped.
pub struct Page {
    pub(super) session: Session,
    pub(super) frames: Arc<Mutex<FrameManager>>,
    pub(super) options: PageOptions,
    feed: Arc<TrackerFeed>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.frames.lock();
        f.debug_struct("Page")
            .field("session_id", &self.session.session_id())
            .field("main_frame", &frames.main_frame_id())
            .field("loader_id", &frames.latest_loader_id())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Attaches to the page behind `session`.
    ///
    /// Enables the `Page` domain and lifecycle events, then seeds the
    /// tracker from `Page.getFrameTree`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::ResponseHasError`] if a setup command is refused
    /// - [`Error::InvalidResponse`] if the frame tree cannot be read
    pub async fn attach(session: Session, options: PageOptions) -> Result<Self> {
        options.validate()?;
        let page = Self::with_tracker(session, FrameManager::new(), options);
        let timeout_ms = page.options.command_timeout_ms;

        page.session
            .send_sync_timeout(&Message::new("Page.enable"), timeout_ms)
            .await?
            .ensure_successful()?;

        let lifecycle = Message::new("Page.setLifecycleEventsEnabled").param("enabled", true);
        page.session
            .send_sync_timeout(&lifecycle, timeout_ms)
            .await?
            .ensure_successful()?;

        let tree = page
            .session
            .send_sync_timeout(&Message::new("Page.getFrameTree"), timeout_ms)
            .await?
            .into_result()?;

        let frame = tree
            .get("frameTree")
            .and_then(|t| t.get("frame"))
            .ok_or_else(|| Error::invalid_response("Page.getFrameTree returned no frame"))?;
        let frame = FramePayload::deserialize_from(frame)?;

        debug!(frame_id = %frame.id, loader_id = %frame.loader_id, url = %frame.url, "Page attached");
        page.frames.lock().seed(frame.id, frame.loader_id, frame.url);

        Ok(page)
    }

    /// Builds a page on a main frame the caller already knows.
    ///
    /// Sends nothing; the caller is responsible for lifecycle events being
    /// enabled on the target.
    #[must_use]
    pub fn from_parts(
        session: Session,
        frame_id: FrameId,
        loader_id: LoaderId,
        options: PageOptions,
    ) -> Self {
        Self::with_tracker(
            session,
            FrameManager::seeded(frame_id, loader_id, String::new()),
            options,
        )
    }

    fn with_tracker(session: Session, tracker: FrameManager, options: PageOptions) -> Self {
        let frames = Arc::new(Mutex::new(tracker));

        let sink = Arc::clone(&frames);
        let subscription = session.subscribe_all(move |event| match event.parse() {
            Ok(parsed) => {
                sink.lock().handle_event(&parsed);
            }
            Err(e) => warn!(method = %event.method, error = %e, "Unreadable page event"),
        });

        let feed = Arc::new(TrackerFeed::new(session.clone(), subscription));

        Self {
            session,
            frames,
            options,
            feed,
        }
    }
}

// ============================================================================
// Page - Accessors
// ============================================================================

impl Page {
    /// Returns the session the page uses.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the page options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Returns the main frame ID.
    #[must_use]
    pub fn main_frame_id(&self) -> Option<FrameId> {
        self.frames.lock().main_frame_id().cloned()
    }

    /// Returns the main frame URL last reported by the browser.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.frames.lock().url().map(str::to_string)
    }

    /// Returns a read-only view of the tracker.
    #[must_use]
    pub fn loader_watch(&self) -> LoaderWatch {
        LoaderWatch::new(Arc::clone(&self.frames), Arc::clone(&self.feed))
    }
}

// ============================================================================
// Page - Lifecycle
// ============================================================================

impl Page {
    /// Pumps the connection once so pending events reach the tracker.
    pub async fn pump(&self) -> Result<usize> {
        self.session.read_data().await
    }

    /// Returns the latest loader generation. Never pumps.
    #[must_use]
    pub fn latest_loader_id(&self) -> Option<LoaderId> {
        self.frames.lock().latest_loader_id().cloned()
    }

    /// Pumps once, then returns the current generation's lifecycle map.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the pump.
    pub async fn get_current_lifecycle(&self) -> Result<LifecycleMap> {
        self.pump().await?;
        Ok(self.frames.lock().lifecycle().clone())
    }

    /// Returns `true` if `name` was recorded under the current generation.
    /// Never pumps.
    #[must_use]
    pub fn has_lifecycle_event(&self, name: &str) -> bool {
        self.frames.lock().has_event(name)
    }

    /// Returns `true` while the main frame is loading. Never pumps.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.frames.lock().is_loading()
    }

    /// Returns the generation and its lifecycle map together. Never pumps.
    #[must_use]
    pub fn lifecycle_snapshot(&self) -> LifecycleSnapshot {
        self.frames.lock().snapshot()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::testing::{event_frame, frame_navigated, frame_tree, lifecycle, ok_frame};
    use crate::transport::mock::MockTransport;

    use crate::page::fixtures::{page_on, session_on};
    use super::*;

    #[tokio::test]
    async fn test_attach_enables_and_seeds() {
        let mock = MockTransport::new();
        mock.respond_to("Page.enable", |id, _| vec![ok_frame(id, json!({}))]);
        mock.respond_to("Page.setLifecycleEventsEnabled", |id, _| {
            vec![ok_frame(id, json!({}))]
        });
        mock.respond_to("Page.getFrameTree", |id, _| {
            vec![ok_frame(id, frame_tree("MAIN", "L1", "https://example.com/"))]
        });

        let page = Page::attach(session_on(&mock), PageOptions::new())
            .await
            .expect("attach");

        assert_eq!(
            mock.sent_methods(),
            vec![
                "Page.enable",
                "Page.setLifecycleEventsEnabled",
                "Page.getFrameTree"
            ]
        );
        assert_eq!(mock.sent()[1]["params"]["enabled"], true);
        assert_eq!(page.main_frame_id(), Some(FrameId::new("MAIN")));
        assert_eq!(page.latest_loader_id(), Some(LoaderId::new("L1")));
        assert_eq!(page.url().as_deref(), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn test_attach_rejects_missing_frame_tree() {
        let mock = MockTransport::new();
        mock.respond_to("Page.enable", |id, _| vec![ok_frame(id, json!({}))]);
        mock.respond_to("Page.setLifecycleEventsEnabled", |id, _| {
            vec![ok_frame(id, json!({}))]
        });
        mock.respond_to("Page.getFrameTree", |id, _| vec![ok_frame(id, json!({}))]);

        let err = Page::attach(session_on(&mock), PageOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_queries_do_not_pump() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");
        mock.push(lifecycle("MAIN", "L1", "load", 3.0));

        assert!(!page.has_lifecycle_event("load"));
        assert!(page.lifecycle_snapshot().lifecycle.is_empty());
        assert_eq!(mock.reads(), 0);
    }

    #[tokio::test]
    async fn test_is_loading_tracks_start_and_stop() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");

        mock.push(event_frame("Page.frameStartedLoading", json!({"frameId": "MAIN"})));
        assert!(!page.is_loading());
        page.pump().await.expect("pump");
        assert!(page.is_loading());

        mock.push(event_frame("Page.frameStoppedLoading", json!({"frameId": "MAIN"})));
        page.pump().await.expect("pump");
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn test_get_current_lifecycle_pumps_first() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");
        mock.push(lifecycle("MAIN", "L1", "DOMContentLoaded", 2.0));
        mock.push(lifecycle("MAIN", "L1", "load", 3.0));

        let map = page.get_current_lifecycle().await.expect("lifecycle");

        assert_eq!(map.get("load"), Some(&3.0));
        assert_eq!(map.get("DOMContentLoaded"), Some(&2.0));
        assert!(page.has_lifecycle_event("load"));
    }

    #[tokio::test]
    async fn test_pump_tracks_new_generation() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");
        mock.push(frame_navigated("MAIN", "L2", "https://example.com/next"));

        page.pump().await.expect("pump");

        assert_eq!(page.latest_loader_id(), Some(LoaderId::new("L2")));
        assert_eq!(page.url().as_deref(), Some("https://example.com/next"));
    }

    #[tokio::test]
    async fn test_watch_keeps_tracker_fed_after_page_drop() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");
        let watch = page.loader_watch();
        let session = page.session().clone();
        drop(page);

        mock.push(frame_navigated("MAIN", "L2", "https://example.com/next"));
        session.read_data().await.expect("pump");

        assert_eq!(watch.latest_loader_id(), Some(LoaderId::new("L2")));
        assert_eq!(session.connection().subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes_after_last_watch() {
        let mock = MockTransport::new();
        let page = page_on(&mock, "L1");
        let watch = page.loader_watch();
        let connection = page.session().connection().clone();
        assert_eq!(connection.subscriber_count(), 1);

        drop(page);
        assert_eq!(connection.subscriber_count(), 1);
        drop(watch);
        assert_eq!(connection.subscriber_count(), 0);
    }
}
