//! Externally observable connection state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the channel.
///
/// Written only by the connection manager; everyone else observes it through
/// a `watch` receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport and no pending timers.
    #[default]
    Idle,
    /// Transport handle created, waiting for the open event.
    Connecting,
    /// Transport open, heartbeat running.
    Open,
    /// Caller-initiated close in progress.
    Closing,
    /// Transport torn down, reconnect timer pending.
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` for [`ConnectionState::Open`].
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` while the channel is trying to (re)establish a transport.
    #[inline]
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }

    /// Lower-case name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
