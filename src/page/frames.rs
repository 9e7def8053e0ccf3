//! Main-frame lifecycle tracking.
//!
//! [`FrameManager`] follows the main frame's loader generation and the
//! lifecycle milestones recorded under it. It is mutated only by inbound
//! events, during a pump; queries never pump.
//!
//! # Transitions
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Page.frameNavigated` (no parent) with a new loader | New generation, lifecycle map cleared |
//! | `Page.frameNavigated` (no parent) with the current loader | URL updated only |
//! | `Page.lifecycleEvent` `init` with a new loader | New generation, then `init` recorded |
//! | `Page.lifecycleEvent` with the current loader | Milestone recorded |
//! | `Page.lifecycleEvent` with any other loader | Dropped as stale |
//! | `Page.navigatedWithinDocument` | URL updated only |
//!
//! A loader that has been replaced is retired for good: events naming it can
//! never make it current again.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::identifiers::{FrameId, LoaderId, SubscriptionId};
use crate::protocol::PageEvent;
use crate::session::Session;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle milestone name to browser timestamp (seconds), for the current
/// generation only.
pub type LifecycleMap = FxHashMap<String, f64>;

/// Generation and lifecycle map read together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LifecycleSnapshot {
    /// Loader generation the map belongs to.
    pub loader_id: Option<LoaderId>,
    /// Milestones recorded under that generation.
    pub lifecycle: LifecycleMap,
}

// ============================================================================
// FrameManager
// ============================================================================

/// Lifecycle tracker for the main frame.
#[derive(Debug, Default)]
pub struct FrameManager {
    main_frame: Option<FrameId>,
    loader_id: Option<LoaderId>,
    url: Option<String>,
    lifecycle: LifecycleMap,
    retired: FxHashSet<LoaderId>,
    generations: u64,
    loading: bool,
}

impl FrameManager {
    /// Creates a tracker that knows nothing about the page yet.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker already on a known main frame and generation.
    #[must_use]
    pub fn seeded(frame_id: FrameId, loader_id: LoaderId, url: impl Into<String>) -> Self {
        let mut frames = Self::new();
        frames.seed(frame_id, loader_id, url);
        frames
    }

    /// Adopts the main frame reported by `Page.getFrameTree`.
    pub fn seed(&mut self, frame_id: FrameId, loader_id: LoaderId, url: impl Into<String>) {
        debug!(frame_id = %frame_id, loader_id = %loader_id, "Seeding main frame");
        self.main_frame = Some(frame_id);
        self.url = Some(url.into());
        if self.loader_id.as_ref() != Some(&loader_id) && !self.retired.contains(&loader_id) {
            self.begin_generation(loader_id);
        }
    }

    /// Applies one event. Returns `true` if the tracker changed.
    pub fn handle_event(&mut self, event: &PageEvent) -> bool {
        match event {
            PageEvent::FrameNavigated {
                frame_id,
                parent_id: None,
                loader_id,
                url,
            } => {
                if self.main_frame.as_ref() != Some(frame_id) {
                    debug!(frame_id = %frame_id, "Main frame changed");
                    self.main_frame = Some(frame_id.clone());
                }
                self.url = Some(url.clone());

                if self.loader_id.as_ref() == Some(loader_id) {
                    return true;
                }
                if self.retired.contains(loader_id) {
                    warn!(loader_id = %loader_id, "Ignoring navigation to retired loader");
                    return false;
                }
                self.begin_generation(loader_id.clone());
                true
            }

            PageEvent::Lifecycle {
                frame_id,
                loader_id,
                name,
                timestamp,
            } => {
                if !self.is_main_frame(frame_id) {
                    return false;
                }

                if self.loader_id.as_ref() != Some(loader_id) {
                    if name == "init" && !self.retired.contains(loader_id) {
                        self.begin_generation(loader_id.clone());
                    } else {
                        warn!(
                            loader_id = %loader_id,
                            current = ?self.loader_id,
                            name = %name,
                            "Dropping stale lifecycle event"
                        );
                        return false;
                    }
                }

                trace!(name = %name, timestamp, "Lifecycle event recorded");
                self.lifecycle.insert(name.clone(), *timestamp);
                true
            }

            PageEvent::NavigatedWithinDocument { frame_id, url } if self.is_main_frame(frame_id) => {
                self.url = Some(url.clone());
                true
            }

            PageEvent::FrameStartedLoading { frame_id } if self.is_main_frame(frame_id) => {
                trace!(loader_id = ?self.loader_id, "Main frame started loading");
                !std::mem::replace(&mut self.loading, true)
            }

            PageEvent::FrameStoppedLoading { frame_id } if self.is_main_frame(frame_id) => {
                trace!(loader_id = ?self.loader_id, "Main frame stopped loading");
                std::mem::replace(&mut self.loading, false)
            }

            _ => false,
        }
    }

    fn is_main_frame(&self, frame_id: &FrameId) -> bool {
        self.main_frame.as_ref() == Some(frame_id)
    }

    fn begin_generation(&mut self, loader_id: LoaderId) {
        debug!(
            previous = ?self.loader_id,
            loader_id = %loader_id,
            "Loader generation changed"
        );
        if let Some(previous) = self.loader_id.replace(loader_id) {
            self.retired.insert(previous);
        }
        self.lifecycle.clear();
        self.generations += 1;
    }
}

// ============================================================================
// FrameManager - Queries
// ============================================================================

impl FrameManager {
    /// Returns the main frame ID.
    #[inline]
    #[must_use]
    pub fn main_frame_id(&self) -> Option<&FrameId> {
        self.main_frame.as_ref()
    }

    /// Returns the latest loader generation.
    #[inline]
    #[must_use]
    pub fn latest_loader_id(&self) -> Option<&LoaderId> {
        self.loader_id.as_ref()
    }

    /// Returns the main frame URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the lifecycle map of the current generation.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleMap {
        &self.lifecycle
    }

    /// Returns `true` if `name` was recorded under the current generation.
    #[inline]
    #[must_use]
    pub fn has_event(&self, name: &str) -> bool {
        self.lifecycle.contains_key(name)
    }

    /// Returns `true` if `loader_id` was current once and has been replaced.
    #[inline]
    #[must_use]
    pub fn is_retired(&self, loader_id: &LoaderId) -> bool {
        self.retired.contains(loader_id)
    }

    /// Returns `true` between `frameStartedLoading` and `frameStoppedLoading`
    /// for the main frame.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of generations adopted so far.
    #[inline]
    #[must_use]
    pub fn generation_count(&self) -> u64 {
        self.generations
    }

    /// Returns the generation and its lifecycle map together.
    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            loader_id: self.loader_id.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

// ============================================================================
// LoaderWatch
// ============================================================================

/// The session subscription that feeds a tracker.
///
/// Unsubscribes when the page and every watch on its tracker are gone.
#[derive(Debug)]
pub(crate) struct TrackerFeed {
    session: Session,
    subscription: SubscriptionId,
}

impl TrackerFeed {
    pub(crate) fn new(session: Session, subscription: SubscriptionId) -> Self {
        Self {
            session,
            subscription,
        }
    }
}

impl Drop for TrackerFeed {
    fn drop(&mut self) {
        self.session.unsubscribe(self.subscription);
    }
}

/// Read-only view of a page's tracker, held by result handles.
///
/// The tracker keeps receiving events while any watch is alive, even after
/// the [`Page`](super::Page) itself is dropped.
#[derive(Debug, Clone)]
pub struct LoaderWatch {
    frames: Arc<Mutex<FrameManager>>,
    _feed: Arc<TrackerFeed>,
}

impl LoaderWatch {
    pub(crate) fn new(frames: Arc<Mutex<FrameManager>>, feed: Arc<TrackerFeed>) -> Self {
        Self {
            frames,
            _feed: feed,
        }
    }

    /// Returns the latest loader generation.
    #[must_use]
    pub fn latest_loader_id(&self) -> Option<LoaderId> {
        self.frames.lock().latest_loader_id().cloned()
    }

    /// Returns `true` if `name` was recorded under the current generation.
    #[must_use]
    pub fn has_event(&self, name: &str) -> bool {
        self.frames.lock().has_event(name)
    }

    /// Returns `true` if `loader_id` has been replaced.
    #[must_use]
    pub fn is_retired(&self, loader_id: &LoaderId) -> bool {
        self.frames.lock().is_retired(loader_id)
    }

    /// Returns the generation and its lifecycle map together.
    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.frames.lock().snapshot()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn navigated(frame: &str, loader: &str) -> PageEvent {
        PageEvent::FrameNavigated {
            frame_id: FrameId::new(frame),
            parent_id: None,
            loader_id: LoaderId::new(loader),
            url: format!("https://example.com/{loader}"),
        }
    }

    fn milestone(frame: &str, loader: &str, name: &str) -> PageEvent {
        PageEvent::Lifecycle {
            frame_id: FrameId::new(frame),
            loader_id: LoaderId::new(loader),
            name: name.to_string(),
            timestamp: 1.0,
        }
    }

    #[test]
    fn test_loading_follows_main_frame_only() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        let started = |id: &str| PageEvent::FrameStartedLoading {
            frame_id: FrameId::new(id),
        };
        let stopped = |id: &str| PageEvent::FrameStoppedLoading {
            frame_id: FrameId::new(id),
        };

        assert!(!frames.handle_event(&started("CHILD")));
        assert!(!frames.is_loading());

        assert!(frames.handle_event(&started("F")));
        assert!(!frames.handle_event(&started("F")));
        assert!(frames.is_loading());

        assert!(!frames.handle_event(&stopped("CHILD")));
        assert!(frames.is_loading());
        assert!(frames.handle_event(&stopped("F")));
        assert!(!frames.is_loading());
        assert_eq!(frames.latest_loader_id(), Some(&LoaderId::new("L1")));
    }

    #[test]
    fn test_new_loader_resets_lifecycle() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&milestone("F", "L1", "load"));
        assert!(frames.has_event("load"));

        frames.handle_event(&navigated("F", "L2"));

        assert_eq!(frames.latest_loader_id(), Some(&LoaderId::new("L2")));
        assert!(frames.lifecycle().is_empty());
        assert!(frames.is_retired(&LoaderId::new("L1")));
        assert_eq!(frames.url(), Some("https://example.com/L2"));
    }

    #[test]
    fn test_same_loader_does_not_reset() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&milestone("F", "L1", "DOMContentLoaded"));
        frames.handle_event(&navigated("F", "L1"));

        assert!(frames.has_event("DOMContentLoaded"));
        assert_eq!(frames.generation_count(), 1);
    }

    #[test]
    fn test_stale_lifecycle_event_dropped() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&navigated("F", "L2"));

        assert!(!frames.handle_event(&milestone("F", "L1", "load")));
        assert!(!frames.has_event("load"));
    }

    #[test]
    fn test_init_with_new_loader_starts_generation() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&milestone("F", "L1", "load"));

        assert!(frames.handle_event(&milestone("F", "L2", "init")));

        assert_eq!(frames.latest_loader_id(), Some(&LoaderId::new("L2")));
        assert!(frames.has_event("init"));
        assert!(!frames.has_event("load"));
    }

    #[test]
    fn test_retired_loader_never_returns() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&navigated("F", "L2"));

        frames.handle_event(&milestone("F", "L1", "init"));
        frames.handle_event(&navigated("F", "L1"));

        assert_eq!(frames.latest_loader_id(), Some(&LoaderId::new("L2")));
    }

    #[test]
    fn test_child_frames_ignored() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");

        let child = PageEvent::FrameNavigated {
            frame_id: FrameId::new("C"),
            parent_id: Some(FrameId::new("F")),
            loader_id: LoaderId::new("CL"),
            url: "https://ads.example.com/".to_string(),
        };
        assert!(!frames.handle_event(&child));
        assert!(!frames.handle_event(&milestone("C", "CL", "load")));

        assert_eq!(frames.latest_loader_id(), Some(&LoaderId::new("L1")));
        assert!(frames.lifecycle().is_empty());
    }

    #[test]
    fn test_lifecycle_before_main_frame_known_is_ignored() {
        let mut frames = FrameManager::new();
        assert!(!frames.handle_event(&milestone("F", "L1", "init")));
        assert!(frames.latest_loader_id().is_none());

        frames.handle_event(&navigated("F", "L1"));
        assert_eq!(frames.main_frame_id(), Some(&FrameId::new("F")));
        assert!(frames.handle_event(&milestone("F", "L1", "load")));
    }

    #[test]
    fn test_snapshot_reads_generation_and_map() {
        let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("L1"), "about:blank");
        frames.handle_event(&milestone("F", "L1", "load"));

        let snapshot = frames.snapshot();
        assert_eq!(snapshot.loader_id, Some(LoaderId::new("L1")));
        assert_eq!(snapshot.lifecycle.get("load"), Some(&1.0));
    }

    proptest! {
        #[test]
        fn prop_consecutive_generations_differ(loaders in prop::collection::vec(0u8..6, 1..40)) {
            let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("seed"), "about:blank");
            let mut previous = frames.latest_loader_id().cloned();

            for loader in loaders {
                let before = frames.generation_count();
                frames.handle_event(&navigated("F", &format!("L{loader}")));

                let current = frames.latest_loader_id().cloned();
                if frames.generation_count() != before {
                    prop_assert_ne!(&current, &previous);
                }
                previous = current;
            }
        }

        #[test]
        fn prop_stale_events_never_recorded(
            loaders in prop::collection::vec(0u8..6, 1..20),
            stale in 0u8..6,
        ) {
            let mut frames = FrameManager::seeded(FrameId::new("F"), LoaderId::new("seed"), "about:blank");
            for loader in loaders {
                frames.handle_event(&navigated("F", &format!("L{loader}")));
            }

            let stale_loader = LoaderId::new(format!("L{stale}"));
            prop_assume!(frames.is_retired(&stale_loader));

            frames.handle_event(&milestone("F", stale_loader.as_str(), "stale-marker"));
            prop_assert!(!frames.has_event("stale-marker"));
        }
    }
}
