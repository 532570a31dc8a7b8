//! Liveness probing.
//!
//! The monitor owns no timers itself; it arms and clears the heartbeat
//! kinds in the manager's [`TimerSet`]. The manager does the actual probe
//! write when [`TimerKind::HeartbeatProbe`] fires.
//!
//! ```text
//! start ──interval──► probe sent ──timeout──► connection declared dead
//!   ▲                     │
//!   └──── pong ◄──────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

use super::timers::{TimerKind, TimerSet};

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Heartbeat timing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Option<Duration>,
}

impl HeartbeatMonitor {
    /// Creates a monitor. `timeout: None` never declares the link dead.
    #[inline]
    #[must_use]
    pub const fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    /// Restarts the cycle: clears both heartbeat timers and schedules the
    /// next probe one interval from `now`.
    pub fn start(&self, timers: &mut TimerSet, now: Instant) {
        self.stop(timers);
        timers.schedule(TimerKind::HeartbeatProbe, now, self.interval);
    }

    /// Clears both heartbeat timers. Idempotent.
    pub fn stop(&self, timers: &mut TimerSet) {
        timers.cancel(TimerKind::HeartbeatProbe);
        timers.cancel(TimerKind::HeartbeatTimeout);
    }

    /// Arms the reply deadline after a probe went out.
    pub fn on_probe_sent(&self, timers: &mut TimerSet, now: Instant) {
        if let Some(timeout) = self.timeout {
            timers.schedule(TimerKind::HeartbeatTimeout, now, timeout);
        }
    }

    /// A reply arrived: start a fresh cycle.
    pub fn on_reply(&self, timers: &mut TimerSet, now: Instant) {
        self.start(timers, now);
    }

    /// Returns `true` if any heartbeat timer is pending.
    #[must_use]
    pub fn is_active(&self, timers: &TimerSet) -> bool {
        timers.is_pending(TimerKind::HeartbeatProbe) || timers.is_pending(TimerKind::HeartbeatTimeout)
    }

    /// Probe interval.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Reply deadline, if enforced.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

// ============================================================================
// Tests
// ============================================================================
