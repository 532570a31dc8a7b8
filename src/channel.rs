//! Public channel handle and its connection task.
//!
//! [`Channel`] is a cheap cloneable handle. Every call is forwarded as a
//! command to one spawned task that owns the [`ConnectionManager`], so all
//! state transitions happen sequentially on that task.
//!
//! # Event Loop
//!
//! The connection task multiplexes three sources:
//!
//! - Commands from [`Channel`] methods
//! - Transport events tagged with the producing handle's id
//! - The earliest pending timer deadline
//!
//! The loop ends on [`Channel::shutdown`] or when every handle is dropped;
//! the transport is closed on the way out.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::config::ChannelConfig;
use crate::connection::{ConnectionManager, ConnectionState, MessageHandler, SharedHandler};
use crate::error::{Error, Result};
use crate::transport::{Connector, EventReceiver, WsConnector};

// ============================================================================
// ChannelCommand
// ============================================================================

/// Internal commands for the connection task.
enum ChannelCommand {
    /// Open a transport, optionally replacing the target.
    Init(Option<String>),
    /// Send or queue a payload.
    Send(String),
    /// Caller-initiated close.
    Close,
    /// Report the outbound backlog.
    Queued(oneshot::Sender<usize>),
    /// Close and stop the task.
    Shutdown,
}

// ============================================================================
// Channel
// ============================================================================

/// Self-healing message channel.
///
/// Sends never fail: while the transport is down they are queued and
/// flushed in order on the next open. Connection loss, errors and missed
/// heartbeats trigger a debounced reconnect to the last target.
///
/// # Example
///
/// ```no_run
/// use resilient_ws::{Channel, ChannelConfig, Result};
///
/// # async fn example() -> Result<()> {
/// let channel = Channel::websocket(ChannelConfig::default())?;
/// channel.set_message_handler(|value| println!("received {value}"));
///
/// channel.send_message(r#"{"subscribe":"prices"}"#);
/// channel.init(Some("ws://127.0.0.1:9000/feed"));
///
/// channel.wait_until_open().await?;
/// assert!(channel.ready());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Channel {
    /// Commands for the connection task.
    command_tx: mpsc::UnboundedSender<ChannelCommand>,
    /// State published by the manager.
    state_rx: watch::Receiver<ConnectionState>,
    /// Consumer callback slot (shared with the manager).
    handler: SharedHandler,
}

// ============================================================================
// Channel - Constructors
// ============================================================================

impl Channel {
    /// Creates a channel over an arbitrary transport.
    ///
    /// Spawns the connection task, so a tokio runtime must be running. The
    /// channel starts [`ConnectionState::Idle`]; call [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ChannelConfig, connector: impl Connector) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(&config, Box::new(connector), event_tx)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let state_rx = manager.subscribe_state();
        let handler = manager.message_handler();

        tokio::spawn(run_event_loop(manager, command_rx, event_rx));

        Ok(Self {
            command_tx,
            state_rx,
            handler,
        })
    }

    /// Creates a channel over the built-in WebSocket transport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn websocket(config: ChannelConfig) -> Result<Self> {
        Self::new(config, WsConnector::new())
    }
}

// ============================================================================
// Channel - Public API
// ============================================================================

impl Channel {
    /// Connects, replacing the remembered target when `url` is given.
    ///
    /// Without a URL the previously configured target is reused.
    pub fn init(&self, url: Option<&str>) {
        self.dispatch(ChannelCommand::Init(url.map(str::to_owned)));
    }

    /// Connects to the previously configured target.
    #[inline]
    pub fn reconnect(&self) {
        self.init(None);
    }

    /// Closes the transport without scheduling a reconnect.
    ///
    /// Queued messages are kept and flushed on a later [`init`](Self::init).
    pub fn close(&self) {
        self.dispatch(ChannelCommand::Close);
    }

    /// Returns `true` if the transport is open.
    #[inline]
    #[must_use]
    pub fn ready(&self) -> bool {
        self.state_rx.borrow().is_open()
    }

    /// Sends a payload, or queues it until the channel is open.
    pub fn send_message(&self, payload: impl Into<String>) {
        self.dispatch(ChannelCommand::Send(payload.into()));
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Waits until the channel reaches [`ConnectionState::Open`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection task has stopped.
    pub async fn wait_until_open(&self) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(ConnectionState::is_open)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Number of payloads waiting for an open transport.
    ///
    /// Returns 0 if the connection task has stopped.
    pub async fn queued(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.dispatch(ChannelCommand::Queued(tx));
        rx.await.unwrap_or_default()
    }

    /// Installs the callback for decoded application payloads.
    ///
    /// Runs on the connection task; keep it short.
    pub fn set_message_handler(&self, handler: impl Fn(Value) + Send + Sync + 'static) {
        let handler: MessageHandler = Arc::new(handler);
        *self.handler.lock() = Some(handler);
    }

    /// Removes the application payload callback.
    pub fn clear_message_handler(&self) {
        *self.handler.lock() = None;
    }

    /// Closes the transport and stops the connection task.
    pub fn shutdown(&self) {
        self.dispatch(ChannelCommand::Shutdown);
    }

    fn dispatch(&self, command: ChannelCommand) {
        if self.command_tx.send(command).is_err() {
            warn!("Connection task stopped; command dropped");
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Drives the manager until shutdown or until every handle is dropped.
async fn run_event_loop(
    mut manager: ConnectionManager,
    mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
    mut event_rx: EventReceiver,
) {
    loop {
        let deadline = manager.next_deadline();

        tokio::select! {
            command = command_rx.recv() => {
                match command {
                    Some(ChannelCommand::Init(url)) => {
                        manager.connect(url.as_deref(), Instant::now());
                    }

                    Some(ChannelCommand::Send(payload)) => manager.send(payload),

                    Some(ChannelCommand::Close) => manager.close(),

                    Some(ChannelCommand::Queued(reply)) => {
                        let _ = reply.send(manager.queued());
                    }

                    Some(ChannelCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        break;
                    }

                    None => {
                        debug!("All channel handles dropped");
                        break;
                    }
                }
            }

            Some((id, event)) = event_rx.recv() => {
                manager.handle_event(id, event, Instant::now());
            }

            () = wait_until(deadline) => {
                manager.fire_expired(Instant::now());
            }
        }
    }

    manager.close();
    debug!("Connection task terminated");
}

/// Sleeps until `deadline`, or forever when nothing is scheduled.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
