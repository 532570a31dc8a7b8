//! Debounced reconnection.
//!
//! Any burst of disconnect signals collapses into one pending attempt: each
//! call pushes the deadline out to `delay` after the latest signal.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

use super::timers::{TimerKind, TimerSet};

// ============================================================================
// ReconnectScheduler
// ============================================================================

/// Reconnect debounce policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectScheduler {
    delay: Duration,
}

impl ReconnectScheduler {
    /// Creates a scheduler with a fixed debounce delay.
    #[inline]
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Replaces any pending attempt with one `delay` after `now`.
    pub fn schedule(&self, timers: &mut TimerSet, now: Instant) -> Instant {
        timers.cancel(TimerKind::Reconnect);
        timers.schedule(TimerKind::Reconnect, now, self.delay)
    }

    /// Drops the pending attempt, if any.
    pub fn cancel(&self, timers: &mut TimerSet) -> bool {
        timers.cancel(TimerKind::Reconnect)
    }

    /// Returns `true` if an attempt is pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, timers: &TimerSet) -> bool {
        timers.is_pending(TimerKind::Reconnect)
    }

    /// Debounce delay.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

// ============================================================================
// Tests
// ============================================================================
