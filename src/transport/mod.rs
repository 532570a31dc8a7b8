//! Transport boundary.
//!
//! The connection manager never touches sockets directly. It asks a
//! [`Connector`] to open a [`TransportHandle`] and receives the handle's
//! lifecycle through an [`EventSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   open(url, sink)   ┌─────────────────────┐
//! │  ConnectionManager   │────────────────────►│  Connector          │
//! │                      │                     │  → TransportHandle  │
//! │  (connection task)   │◄────────────────────│  (background I/O)   │
//! └──────────────────────┘  (TransportId, ev)  └─────────────────────┘
//! ```
//!
//! `open` must not block: it returns as soon as the attempt is issued and
//! reports the outcome later as [`TransportEvent::Open`],
//! [`TransportEvent::Close`] or [`TransportEvent::Error`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | `tokio-tungstenite` client connector |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;
use crate::identifiers::TransportId;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WsConnector;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle notification emitted by a transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Transport is open and ready to send.
    Open,
    /// A text payload was received.
    Message(String),
    /// Transport closed, with the peer's reason if any.
    Close(Option<String>),
    /// Transport failed.
    Error(String),
}

/// Channel carrying events tagged with the producing handle's id.
pub type EventSender = mpsc::UnboundedSender<(TransportId, TransportEvent)>;

/// Receiving side of [`EventSender`].
pub type EventReceiver = mpsc::UnboundedReceiver<(TransportId, TransportEvent)>;

// ============================================================================
// EventSink
// ============================================================================

/// Listener slot bound to one transport handle.
///
/// Once [`detach`](Self::detach) is called, further emits are discarded.
/// Events already queued before detachment are filtered by the receiver
/// using [`TransportId`].
#[derive(Debug, Clone)]
pub struct EventSink {
    id: TransportId,
    tx: EventSender,
    attached: Arc<AtomicBool>,
}

impl EventSink {
    /// Creates an attached sink for the given handle id.
    #[must_use]
    pub fn new(id: TransportId, tx: EventSender) -> Self {
        Self {
            id,
            tx,
            attached: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Id of the handle this sink belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransportId {
        self.id
    }

    /// Delivers an event. Returns `false` if it was discarded.
    pub fn emit(&self, event: TransportEvent) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.tx.send((self.id, event)).is_ok()
    }

    /// Detaches the listeners; subsequent emits are dropped.
    #[inline]
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    /// Returns `true` while listeners are attached and the receiver is alive.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire) && !self.tx.is_closed()
    }
}

// ============================================================================
// ReadyState
// ============================================================================

/// Readiness of a transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    /// Attempt issued, not open yet.
    Connecting = 0,
    /// Open and able to send.
    Open = 1,
    /// Close requested.
    Closing = 2,
    /// Closed or failed.
    Closed = 3,
}

/// Lock-free [`ReadyState`] cell shared between a handle and its I/O task.
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    /// Creates a cell starting at [`ReadyState::Connecting`].
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ReadyState::Connecting as u8)))
    }

    /// Loads the current state.
    #[must_use]
    pub fn get(&self) -> ReadyState {
        match self.0.load(Ordering::Acquire) {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    /// Stores a new state.
    pub fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for SharedReadyState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A live transport instance, exclusively owned by the connection manager.
pub trait TransportHandle: Send {
    /// Writes a text payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle can no longer accept writes.
    fn send(&mut self, payload: &str) -> Result<()>;

    /// Returns `true` if the handle is open and can send.
    fn is_ready(&self) -> bool;

    /// Requests closure. Must not block.
    fn close(&mut self);
}

/// Factory for transport handles.
pub trait Connector: Send + 'static {
    /// Returns `false` if the platform offers no transport capability.
    fn is_supported(&self) -> bool {
        true
    }

    /// Issues a connection attempt and returns the handle immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be issued.
    fn open(&self, url: &Url, sink: EventSink) -> Result<Box<dyn TransportHandle>>;
}

// ============================================================================
// Tests
// ============================================================================
