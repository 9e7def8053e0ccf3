//! Page façade.
//!
//! A [`Page`] composes the correlator and the lifecycle tracker into the
//! public page operations.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Page struct, attach, lifecycle queries |
//! | `frames` | Main-frame lifecycle tracker |
//! | `navigation` | Navigate, reload, lifecycle waits |
//! | `script` | JavaScript evaluation |
//! | `screenshot` | Screenshot options and capture |
//!
//! # Example
//!
//! ```ignore
//! let page = Page::attach(session, PageOptions::new()).await?;
//!
//! // Navigate and wait for load
//! let navigation = page.navigate("https://example.com").await?;
//! navigation.wait_for_navigation("load", 30_000).await?;
//!
//! // Evaluate, refusing values from a document that has since been replaced
//! let result = page.evaluate("document.title").await?.wait_for_result(5_000).await?;
//! let title = result.value_if_current()?;
//!
//! // Screenshot
//! page.screenshot(&ScreenshotOptions::jpeg(80)).await?.save_to("page.jpg", 5_000).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
pub mod frames;
mod navigation;
mod screenshot;
mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Page;
pub use frames::{FrameManager, LifecycleMap, LifecycleSnapshot, LoaderWatch};
pub use navigation::NavigationHandle;
pub use screenshot::{Clip, ImageFormat, ScreenshotHandle, ScreenshotOptions};
pub use script::{EvaluationHandle, EvaluationResult};

// ============================================================================
// Test Fixtures
// ============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use crate::identifiers::{FrameId, LoaderId};
    use crate::options::{ConnectionOptions, PageOptions};
    use crate::session::Session;
    use crate::testing::FakeClock;
    use crate::transport::Connection;
    use crate::transport::mock::MockTransport;

    use super::Page;

    pub(crate) fn session_with_clock(mock: &MockTransport) -> (Session, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        let connection =
            Connection::with_clock(mock.clone(), ConnectionOptions::new(), clock.clone());
        (Session::new(connection), clock)
    }

    pub(crate) fn session_on(mock: &MockTransport) -> Session {
        session_with_clock(mock).0
    }

    /// Page on main frame `MAIN`, already at generation `loader_id`.
    pub(crate) fn page_with_clock(mock: &MockTransport, loader_id: &str) -> (Page, Arc<FakeClock>) {
        let (session, clock) = session_with_clock(mock);
        let page = Page::from_parts(
            session,
            FrameId::new("MAIN"),
            LoaderId::new(loader_id),
            PageOptions::new(),
        );
        (page, clock)
    }

    pub(crate) fn page_on(mock: &MockTransport, loader_id: &str) -> Page {
        page_with_clock(mock, loader_id).0
    }
}
