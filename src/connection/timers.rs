//! Named single-shot timers.
//!
//! A [`TimerSet`] holds at most one deadline per [`TimerKind`]. The
//! connection task awaits [`TimerSet::next_deadline`] and feeds expired
//! kinds back to the manager, so cancellation is synchronous: a cancelled
//! timer can never fire afterwards.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// TimerKind
// ============================================================================

/// Purpose of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next liveness probe.
    HeartbeatProbe,
    /// Deadline for the probe reply.
    HeartbeatTimeout,
    /// Debounced reconnect attempt.
    Reconnect,
}

impl TimerKind {
    /// All kinds, in tie-break order.
    pub const ALL: [Self; 3] = [Self::HeartbeatProbe, Self::HeartbeatTimeout, Self::Reconnect];

    #[inline]
    const fn slot(self) -> usize {
        match self {
            Self::HeartbeatProbe => 0,
            Self::HeartbeatTimeout => 1,
            Self::Reconnect => 2,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HeartbeatProbe => "heartbeat-probe",
            Self::HeartbeatTimeout => "heartbeat-timeout",
            Self::Reconnect => "reconnect",
        })
    }
}

// ============================================================================
// TimerSet
// ============================================================================

/// One optional deadline per [`TimerKind`].
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    deadlines: [Option<Instant>; 3],
}

impl TimerSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deadlines: [None; 3],
        }
    }

    /// Schedules `kind` to fire `delay` after `now`, replacing any pending
    /// deadline of the same kind. Returns the new deadline.
    pub fn schedule(&mut self, kind: TimerKind, now: Instant, delay: Duration) -> Instant {
        let deadline = now + delay;
        self.deadlines[kind.slot()] = Some(deadline);
        deadline
    }

    /// Cancels `kind`. Returns `true` if a deadline was pending.
    ///
    /// Cancelling an idle kind is a no-op.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines[kind.slot()].take().is_some()
    }

    /// Cancels every kind.
    pub fn cancel_all(&mut self) {
        self.deadlines = [None; 3];
    }

    /// Returns `true` if `kind` is pending.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.deadlines[kind.slot()].is_some()
    }

    /// Pending deadline of `kind`.
    #[inline]
    #[must_use]
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines[kind.slot()]
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.deadlines.iter().flatten().count()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Removes and returns the earliest kind whose deadline is at or before
    /// `now`. Ties resolve in [`TimerKind::ALL`] order.
    pub fn pop_expired(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.deadline(kind).map(|at| (at, kind)))
            .filter(|(at, _)| *at <= now)
            .min_by_key(|(at, kind)| (*at, kind.slot()))
            .map(|(_, kind)| kind)?;

        self.cancel(kind);
        Some(kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
