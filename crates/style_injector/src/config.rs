//! Configuration for style injection and visibility coordination.
//!
//! Values can be constructed programmatically or loaded from environment
//! variables.

use core::time::Duration;
use std::env;

/// Default interval between stylesheet readiness checks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4;

/// Default priority of the relayout pass requested after render-delaying services.
pub const DEFAULT_RELAYOUT_PRIORITY: u32 = 1;

/// Runtime configuration for the style injector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectorConfig {
    /// Interval between readiness checks for a freshly inserted stylesheet
    pub poll_interval_ms: u64,
    /// Optional cap on readiness checks; `None` polls until the sheet is active
    pub max_polls: Option<u32>,
    /// Priority passed to the relayout pass scheduled after waiting on services
    pub relayout_priority: u32,
}

impl Default for InjectorConfig {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_MS, None, DEFAULT_RELAYOUT_PRIORITY)
    }
}

impl InjectorConfig {
    /// Construct a new `InjectorConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `poll_interval_ms` - Readiness poll interval in milliseconds (minimum 1ms)
    /// * `max_polls` - Optional cap on readiness checks per stylesheet
    /// * `relayout_priority` - Priority of the post-services relayout pass
    #[inline]
    #[must_use]
    pub const fn new(poll_interval_ms: u64, max_polls: Option<u32>, relayout_priority: u32) -> Self {
        let interval = if poll_interval_ms < 1 {
            1
        } else {
            poll_interval_ms
        };
        Self {
            poll_interval_ms: interval,
            max_polls,
            relayout_priority,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `STYLE_POLL_INTERVAL_MS`: Readiness poll interval in milliseconds (default: 4)
    /// - `STYLE_MAX_POLLS`: Cap on readiness checks; unset or 0 polls without limit
    /// - `STYLE_RELAYOUT_PRIORITY`: Relayout pass priority (default: 1)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let poll_interval_ms = env::var("STYLE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
            .max(1);
        let max_polls = env::var("STYLE_MAX_POLLS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .and_then(|polls| (polls > 0).then_some(polls));
        let relayout_priority = env::var("STYLE_RELAYOUT_PRIORITY")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RELAYOUT_PRIORITY);
        Self {
            poll_interval_ms,
            max_polls,
            relayout_priority,
        }
    }

    /// Get the readiness poll interval as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
