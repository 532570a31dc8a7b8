//! Connection lifecycle core.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionManager`] | Owns the transport and the state machine |
//! | [`HeartbeatMonitor`] | Probe interval and reply deadline |
//! | [`ReconnectScheduler`] | Debounced single reconnect attempt |
//! | [`OutboundQueue`] | FIFO of payloads waiting for an open transport |
//! | [`TimerSet`] | One cancellable deadline per [`TimerKind`] |
//! | [`ConnectionState`] | Observable lifecycle state |

// ============================================================================
// Submodules
// ============================================================================

/// Liveness probing.
pub mod heartbeat;

/// Connection lifecycle state machine.
pub mod manager;

/// Outbound message buffer.
pub mod queue;

/// Debounced reconnection.
pub mod reconnect;

/// Observable connection state.
pub mod state;

/// Named single-shot timers.
pub mod timers;

// ============================================================================
// Re-exports
// ============================================================================

pub use heartbeat::HeartbeatMonitor;
pub use manager::{ConnectionManager, MessageHandler, SharedHandler};
pub use queue::OutboundQueue;
pub use reconnect::ReconnectScheduler;
pub use state::ConnectionState;
pub use timers::{TimerKind, TimerSet};
