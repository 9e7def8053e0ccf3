//! Connection and page configuration.
//!
//! Provides type-safe configuration for the correlator and the page façade.
//!
//! # Time Units
//!
//! Public wait operations take their timeout in milliseconds (`u64`). The
//! value is converted once, by [`crate::poll::timeout_from_millis`], into the
//! [`Duration`] budget the poll driver consumes. Poll intervals are plain
//! [`Duration`]s.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use devtools_driver::{ConnectionOptions, PageOptions};
//!
//! let connection = ConnectionOptions::new().with_read_timeout(Duration::from_millis(20));
//! let page = PageOptions::new().with_navigation_timeout_ms(10_000);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// How long one WebSocket pump waits for a first frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Maximum commands awaiting a reply before new sends are refused.
pub const DEFAULT_MAX_PENDING: usize = 1000;

/// Delay quantum between polls of a deferred response.
pub const DEFAULT_RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Delay quantum between lifecycle checks while waiting for a reload.
pub const DEFAULT_RELOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Budget for `Page.navigate` and friends, in milliseconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Budget for setup commands such as `Page.enable`, in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Correlator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// How long a single pump waits for the first available frame.
    pub read_timeout: Duration,

    /// Maximum number of commands awaiting a reply.
    pub max_pending: usize,

    /// Delay quantum used by [`crate::ResponseReader::wait_for_response`].
    pub response_poll_interval: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
            response_poll_interval: DEFAULT_RESPONSE_POLL_INTERVAL,
        }
    }

    /// Sets the per-pump read timeout.
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets the pending command limit.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Sets the deferred response poll interval.
    #[inline]
    #[must_use]
    pub fn with_response_poll_interval(mut self, interval: Duration) -> Self {
        self.response_poll_interval = interval;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a limit or interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be greater than zero"));
        }
        if self.response_poll_interval.is_zero() {
            return Err(Error::config(
                "response_poll_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// PageOptions
// ============================================================================

/// Page façade configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    /// Budget for the blocking `Page.navigate` / `Page.reload` reply, in ms.
    pub navigation_timeout_ms: u64,

    /// Budget for setup commands sent during attach, in ms.
    pub command_timeout_ms: u64,

    /// Delay quantum between lifecycle checks.
    pub reload_poll_interval: Duration,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PageOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            reload_poll_interval: DEFAULT_RELOAD_POLL_INTERVAL,
        }
    }

    /// Sets the navigation reply budget.
    #[inline]
    #[must_use]
    pub fn with_navigation_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Sets the setup command budget.
    #[inline]
    #[must_use]
    pub fn with_command_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.command_timeout_ms = timeout_ms;
        self
    }

    /// Sets the lifecycle poll interval.
    #[inline]
    #[must_use]
    pub fn with_reload_poll_interval(mut self, interval: Duration) -> Self {
        self.reload_poll_interval = interval;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.reload_poll_interval.is_zero() {
            return Err(Error::config("reload_poll_interval must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
