//! Resilient WebSocket channel.
//!
//! Maintains one logical bidirectional message channel over an unreliable
//! transport. Connection loss, dead links and outages are handled behind
//! the [`Channel`] handle: sends never fail, and reconnection only shows up
//! as latency.
//!
//! # Architecture
//!
//! - **[`Channel`]**: cloneable handle; forwards calls to a connection task
//! - **[`ConnectionManager`]**: single writer of [`ConnectionState`], owns the transport
//! - **Heartbeat**: `ping` every interval, forced reconnect if no `pong` in time
//! - **Reconnect**: one debounced attempt after any close, error or missed heartbeat
//! - **Outbound queue**: payloads sent while not open, flushed FIFO on open
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use resilient_ws::{Channel, ChannelConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ChannelConfig::new()
//!         .with_url("ws://127.0.0.1:9000/feed")
//!         .with_reconnect_delay(Duration::from_secs(1));
//!
//!     let channel = Channel::websocket(config)?;
//!     channel.set_message_handler(|value| println!("{value}"));
//!     channel.init(None);
//!
//!     channel.send_message(r#"{"op":"subscribe"}"#);
//!     channel.wait_until_open().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | Public handle and connection task |
//! | [`config`] | Timing and target configuration |
//! | [`connection`] | State machine, heartbeat, reconnect, queue, timers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Transport instance ids |
//! | [`protocol`] | Liveness sentinels and payload decoding |
//! | [`transport`] | Transport traits and the WebSocket connector |

// ============================================================================
// Modules
// ============================================================================

/// Public channel handle and connection task.
pub mod channel;

/// Channel configuration.
pub mod config;

/// Connection lifecycle core.
///
/// Synchronous building blocks driven by the connection task.
pub mod connection;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Liveness sentinels and payload decoding.
pub mod protocol;

/// Transport traits and implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::Channel;

// Configuration
pub use config::ChannelConfig;

// Connection core
pub use connection::{ConnectionManager, ConnectionState, MessageHandler, TimerKind};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::TransportId;

// Transport types
pub use transport::{
    Connector, EventSink, ReadyState, TransportEvent, TransportHandle, WsConnector,
};
