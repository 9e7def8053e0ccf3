//! Navigation, reload, and lifecycle waits.
//!
//! Every wait here is a [`LifecycleWait`] step advanced by the poll driver:
//! the first check reads the tracker as it is; every later check pumps the
//! connection once first, so a condition that already holds returns without
//! sleeping.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::LoaderId;
use crate::poll::{PollStep, Step, poll_until, timeout_from_millis};
use crate::protocol::Message;
use crate::session::Session;

use super::Page;
use super::frames::LoaderWatch;

// ============================================================================
// Types
// ============================================================================

/// What a navigation is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expectation {
    /// A cross-document navigation to a known loader.
    Generation(LoaderId),
    /// Any generation other than the one in effect before the command.
    AnyNewGeneration,
    /// A same-document navigation; the generation does not change.
    SameDocument,
}

/// Condition a [`LifecycleWait`] checks.
#[derive(Debug, Clone)]
enum WaitCondition {
    /// The frame left `from` and the new generation has the event.
    Leave { from: Option<LoaderId> },
    /// The frame is on `expected` and it has the event.
    Enter { expected: LoaderId },
    /// The current generation has the event.
    Current,
}

// ============================================================================
// Page - Navigation
// ============================================================================

impl Page {
    /// Navigates the main frame to `url`.
    ///
    /// Pumps once so the generation snapshot is current, then waits for the
    /// `Page.navigate` reply for at most `navigation_timeout_ms`. Does not
    /// wait for the document to load; use the returned handle for that.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseHasError`] naming `url` if the browser refuses the
    ///   navigation or reports an `errorText`
    /// - [`Error::OperationTimedOut`] if the reply does not arrive in time
    pub async fn navigate(&self, url: &str) -> Result<NavigationHandle> {
        self.pump().await?;
        let previous = self.latest_loader_id();
        debug!(url = %url, previous = ?previous, "Navigating");

        let message = Message::new("Page.navigate").param("url", url);
        let result = self
            .session
            .send_sync_timeout(&message, self.options.navigation_timeout_ms)
            .await?
            .into_result()
            .map_err(|e| navigation_error(url, e))?;

        if let Some(text) = result.get("errorText").and_then(Value::as_str) {
            return Err(navigation_error(url, Error::response_has_error(text)));
        }

        let expectation = match result.get("loaderId").and_then(Value::as_str) {
            Some(loader_id) => Expectation::Generation(LoaderId::new(loader_id)),
            None => Expectation::SameDocument,
        };

        Ok(self.navigation_handle(url, previous, expectation))
    }

    /// Reloads the page.
    ///
    /// The returned handle is satisfied by any generation other than the one
    /// in effect when the command was sent.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseHasError`] if the browser refuses the reload
    /// - [`Error::OperationTimedOut`] if the reply does not arrive in time
    pub async fn reload(&self, ignore_cache: bool) -> Result<NavigationHandle> {
        self.pump().await?;
        let previous = self.latest_loader_id();
        debug!(ignore_cache, previous = ?previous, "Reloading");

        let message = Message::new("Page.reload").param("ignoreCache", ignore_cache);
        self.session
            .send_sync_timeout(&message, self.options.navigation_timeout_ms)
            .await?
            .ensure_successful()?;

        let url = self.url().unwrap_or_default();
        Ok(self.navigation_handle(&url, previous, Expectation::AnyNewGeneration))
    }

    /// Waits until the main frame has moved past `loader_id` and the new
    /// generation has recorded `event_name`.
    ///
    /// `loader_id` defaults to the generation current at the call.
    ///
    /// # Errors
    ///
    /// - [`Error::OperationTimedOut`] if the condition does not hold in time
    /// - transport errors from a pump
    pub async fn wait_for_reload(
        &self,
        event_name: &str,
        timeout_ms: u64,
        loader_id: Option<LoaderId>,
    ) -> Result<&Self> {
        let from = loader_id.or_else(|| self.latest_loader_id());
        let mut step = LifecycleWait::new(
            self.session.clone(),
            self.loader_watch(),
            event_name,
            WaitCondition::Leave { from },
            self.options.reload_poll_interval,
        );

        poll_until(
            &mut step,
            timeout_from_millis(timeout_ms),
            self.session.connection().clock(),
            &format!("wait for {event_name} after reload"),
        )
        .await?;

        debug!(event = %event_name, loader_id = ?self.latest_loader_id(), "Reload observed");
        Ok(self)
    }

    fn navigation_handle(
        &self,
        url: &str,
        previous: Option<LoaderId>,
        expectation: Expectation,
    ) -> NavigationHandle {
        NavigationHandle {
            session: self.session.clone(),
            watch: self.loader_watch(),
            url: url.to_string(),
            previous,
            expectation,
            poll_interval: self.options.reload_poll_interval,
        }
    }
}

fn navigation_error(url: &str, error: Error) -> Error {
    match error {
        Error::ResponseHasError { message } => {
            Error::response_has_error(format!("Could not navigate to \"{url}\": {message}"))
        }
        other => other,
    }
}

// ============================================================================
// NavigationHandle
// ============================================================================

/// Result of [`Page::navigate`] or [`Page::reload`].
///
/// Holds the generation in effect before the command and what the command
/// is expected to produce.
#[derive(Debug, Clone)]
pub struct NavigationHandle {
    session: Session,
    watch: LoaderWatch,
    url: String,
    previous: Option<LoaderId>,
    expectation: Expectation,
    poll_interval: Duration,
}

impl NavigationHandle {
    /// Returns the requested URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the generation in effect before the command was sent.
    #[inline]
    #[must_use]
    pub fn previous_loader_id(&self) -> Option<&LoaderId> {
        self.previous.as_ref()
    }

    /// Returns the generation the browser said the navigation creates.
    #[must_use]
    pub fn loader_id(&self) -> Option<&LoaderId> {
        match &self.expectation {
            Expectation::Generation(loader_id) => Some(loader_id),
            _ => None,
        }
    }

    /// Returns `true` for a fragment or history API navigation.
    #[must_use]
    pub fn is_same_document(&self) -> bool {
        self.expectation == Expectation::SameDocument
    }

    /// Waits until the navigation has reached `event_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::NavigationExpired`] if the expected generation was replaced
    ///   before it reached the event
    /// - [`Error::OperationTimedOut`] if the event does not arrive in time
    /// - transport errors from a pump
    pub async fn wait_for_navigation(&self, event_name: &str, timeout_ms: u64) -> Result<()> {
        let condition = match &self.expectation {
            Expectation::Generation(expected) => WaitCondition::Enter {
                expected: expected.clone(),
            },
            Expectation::AnyNewGeneration => WaitCondition::Leave {
                from: self.previous.clone(),
            },
            Expectation::SameDocument => WaitCondition::Current,
        };

        let mut step = LifecycleWait::new(
            self.session.clone(),
            self.watch.clone(),
            event_name,
            condition,
            self.poll_interval,
        );

        poll_until(
            &mut step,
            timeout_from_millis(timeout_ms),
            self.session.connection().clock(),
            &format!("wait for {event_name} on {}", self.url),
        )
        .await?;

        debug!(url = %self.url, event = %event_name, "Navigation complete");
        Ok(())
    }
}

// ============================================================================
// LifecycleWait
// ============================================================================

/// Poll step checking the tracker for a lifecycle condition.
struct LifecycleWait {
    session: Session,
    watch: LoaderWatch,
    event_name: String,
    condition: WaitCondition,
    interval: Duration,
    pump_next: bool,
}

impl LifecycleWait {
    fn new(
        session: Session,
        watch: LoaderWatch,
        event_name: &str,
        condition: WaitCondition,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            watch,
            event_name: event_name.to_string(),
            condition,
            interval,
            pump_next: false,
        }
    }

    fn check(&self) -> Result<bool> {
        let latest = self.watch.latest_loader_id();

        match &self.condition {
            WaitCondition::Leave { from } => {
                Ok(latest != *from && self.watch.has_event(&self.event_name))
            }
            WaitCondition::Enter { expected } => {
                if latest.as_ref() == Some(expected) {
                    return Ok(self.watch.has_event(&self.event_name));
                }
                if self.watch.is_retired(expected) {
                    return Err(Error::navigation_expired(expected.clone(), latest.as_ref()));
                }
                Ok(false)
            }
            WaitCondition::Current => Ok(self.watch.has_event(&self.event_name)),
        }
    }
}

#[async_trait]
impl PollStep for LifecycleWait {
    type Output = ();

    async fn step(&mut self) -> Result<Step<()>> {
        if self.pump_next {
            self.session.read_data().await?;
        }

        if self.check()? {
            return Ok(Step::Done(()));
        }

        self.pump_next = true;
        Ok(Step::Continue(self.interval))
    }
}

// ============================================================================
// Tests
// ============================================================================
