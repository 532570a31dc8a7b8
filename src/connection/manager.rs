//! Connection lifecycle state machine.
//!
//! [`ConnectionManager`] owns the transport handle, the timers, the outbound
//! queue and the [`ConnectionState`]. It is synchronous: the caller feeds it
//! commands, transport events and expired timers along with the current
//! instant. [`Channel`](crate::Channel) drives it from a single tokio task.
//!
//! # Transitions
//!
//! ```text
//! Idle          --connect-->            Connecting
//! Connecting    --open-->               Open          (heartbeat, flush)
//! Connecting    --close/error-->        Reconnecting  (teardown)
//! Open          --close/error-->        Reconnecting  (teardown)
//! Open          --heartbeat timeout-->  Reconnecting  (teardown)
//! Reconnecting  --timer-->              Connecting
//! any           --close-->              Closing --> Idle
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::config::{ChannelConfig, parse_target};
use crate::error::Result;
use crate::identifiers::TransportId;
use crate::protocol::{self, Incoming, PING};
use crate::transport::{Connector, EventSender, EventSink, TransportEvent, TransportHandle};

use super::heartbeat::HeartbeatMonitor;
use super::queue::OutboundQueue;
use super::reconnect::ReconnectScheduler;
use super::state::ConnectionState;
use super::timers::{TimerKind, TimerSet};

// ============================================================================
// Types
// ============================================================================

/// Consumer callback for decoded application payloads.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Handler slot shared between the manager and its [`Channel`](crate::Channel).
pub type SharedHandler = Arc<Mutex<Option<MessageHandler>>>;

/// The live transport together with the listener slot bound to it.
struct Attached {
    id: TransportId,
    handle: Box<dyn TransportHandle>,
    sink: EventSink,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Single writer of the connection state.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    url: Option<Url>,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    transport: Option<Attached>,
    timers: TimerSet,
    queue: OutboundQueue,
    heartbeat: HeartbeatMonitor,
    reconnect: ReconnectScheduler,
    event_tx: EventSender,
    handler: SharedHandler,
    unsupported_reported: bool,
}

// ============================================================================
// ConnectionManager - Constructor
// ============================================================================

impl ConnectionManager {
    /// Creates an idle manager.
    ///
    /// Events from handles opened by this manager are sent on `event_tx`
    /// and must be fed back through [`handle_event`](Self::handle_event).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(
        config: &ChannelConfig,
        connector: Box<dyn Connector>,
        event_tx: EventSender,
    ) -> Result<Self> {
        config.validate()?;

        let url = config.url.as_deref().map(parse_target).transpose()?;
        let (state_tx, _) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            connector,
            url,
            state: ConnectionState::Idle,
            state_tx,
            transport: None,
            timers: TimerSet::new(),
            queue: OutboundQueue::new(),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval(), config.heartbeat_timeout()),
            reconnect: ReconnectScheduler::new(config.reconnect_delay()),
            event_tx,
            handler: Arc::new(Mutex::new(None)),
            unsupported_reported: false,
        })
    }
}

// ============================================================================
// ConnectionManager - Public Contract
// ============================================================================

impl ConnectionManager {
    /// Opens a fresh transport.
    ///
    /// A supplied `url` replaces the remembered target. Any existing handle
    /// is torn down and any pending reconnect cancelled first, so at most one
    /// handle exists. Without transport capability this is a no-op reported
    /// once.
    pub fn connect(&mut self, url: Option<&str>, now: Instant) {
        if !self.connector.is_supported() {
            if !self.unsupported_reported {
                error!("Transport not supported on this platform; channel disabled");
                self.unsupported_reported = true;
            }
            return;
        }

        if let Some(raw) = url {
            match parse_target(raw) {
                Ok(parsed) => self.url = Some(parsed),
                Err(e) => {
                    warn!(error = %e, "Rejected connect target");
                    return;
                }
            }
        }

        let Some(target) = self.url.clone() else {
            warn!("Connect requested but no target URL configured");
            return;
        };

        if self.transport.is_some() {
            self.teardown();
        }
        self.reconnect.cancel(&mut self.timers);

        let id = TransportId::next();
        let sink = EventSink::new(id, self.event_tx.clone());
        self.set_state(ConnectionState::Connecting);

        match self.connector.open(&target, sink.clone()) {
            Ok(handle) => {
                debug!(transport_id = %id, url = %target, "Transport opening");
                self.transport = Some(Attached { id, handle, sink });
            }
            Err(e) => {
                sink.detach();
                warn!(error = %e, url = %target, "Transport open failed");
                self.schedule_reconnect(now);
            }
        }
    }

    /// Writes `message` directly when open, otherwise queues it.
    pub fn send(&mut self, message: String) {
        if self.state.is_open()
            && let Some(transport) = self.transport.as_mut()
            && transport.handle.is_ready()
        {
            match transport.handle.send(&message) {
                Ok(()) => {
                    trace!(transport_id = %transport.id, len = message.len(), "Message sent");
                    return;
                }
                Err(e) => {
                    warn!(transport_id = %transport.id, error = %e, "Direct send failed; queuing");
                }
            }
        }

        self.queue.enqueue(message);
        debug!(queued = self.queue.len(), state = %self.state, "Message queued");
    }

    /// Returns `true` if a handle exists and reports ready.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| transport.handle.is_ready())
    }

    /// Caller-initiated shutdown. Never schedules a reconnect.
    pub fn close(&mut self) {
        self.set_state(ConnectionState::Closing);
        self.teardown();
        self.timers.cancel_all();
        self.set_state(ConnectionState::Idle);
        info!(queued = self.queue.len(), "Channel closed");
    }

    /// Stops the heartbeat, detaches listeners, closes the transport if
    /// ready and drops the handle. Leaves the state untouched.
    pub fn teardown(&mut self) {
        self.heartbeat.stop(&mut self.timers);

        if let Some(mut transport) = self.transport.take() {
            transport.sink.detach();
            if transport.handle.is_ready() {
                transport.handle.close();
            }
            debug!(transport_id = %transport.id, "Transport torn down");
        }
    }

    /// Tears down and arms a single debounced reconnect attempt.
    pub fn schedule_reconnect(&mut self, now: Instant) {
        self.teardown();
        self.set_state(ConnectionState::Reconnecting);
        self.reconnect.schedule(&mut self.timers, now);
        debug!(
            delay_ms = self.reconnect.delay().as_millis() as u64,
            "Reconnect scheduled"
        );
    }
}

// ============================================================================
// ConnectionManager - Event Dispatch
// ============================================================================

impl ConnectionManager {
    /// Applies a transport event. Events from any handle other than the
    /// current one are dropped.
    pub fn handle_event(&mut self, id: TransportId, event: TransportEvent, now: Instant) {
        if self.current_transport() != Some(id) {
            trace!(transport_id = %id, ?event, "Ignoring event from stale transport");
            return;
        }

        match event {
            TransportEvent::Open => self.on_open(now),
            TransportEvent::Message(payload) => self.on_message(&payload, now),
            TransportEvent::Close(reason) => {
                warn!(transport_id = %id, ?reason, "Connection closed");
                self.schedule_reconnect(now);
            }
            TransportEvent::Error(info) => {
                warn!(transport_id = %id, error = %info, "Connection error");
                self.schedule_reconnect(now);
            }
        }
    }

    /// Fires every timer whose deadline is at or before `now`.
    pub fn fire_expired(&mut self, now: Instant) {
        while let Some(kind) = self.timers.pop_expired(now) {
            self.on_timer(kind, now);
        }
    }

    fn on_open(&mut self, now: Instant) {
        self.set_state(ConnectionState::Open);
        self.heartbeat.start(&mut self.timers, now);

        let mut pending = std::mem::take(&mut self.queue);
        let flushed = pending.drain_to(|message| self.send(message));

        info!(
            transport_id = ?self.current_transport(),
            flushed,
            "Connection open"
        );
    }

    fn on_message(&mut self, payload: &str, now: Instant) {
        match Incoming::classify(payload) {
            Incoming::Pong => {
                trace!("Heartbeat reply");
                if self.state.is_open() {
                    self.heartbeat.on_reply(&mut self.timers, now);
                }
            }
            Incoming::Data(data) => match protocol::decode(data) {
                Ok(value) => {
                    let handler = self.handler.lock().clone();
                    match handler {
                        Some(handler) => handler(value),
                        None => trace!("No message handler installed; payload dropped"),
                    }
                }
                Err(e) => warn!(error = %e, "Failed to decode incoming payload"),
            },
        }
    }

    fn on_timer(&mut self, kind: TimerKind, now: Instant) {
        trace!(timer = %kind, "Timer fired");

        match kind {
            TimerKind::HeartbeatProbe => {
                if !self.transmit(PING) {
                    debug!("Heartbeat probe not written; transport not ready");
                }
                self.heartbeat.on_probe_sent(&mut self.timers, now);
            }
            TimerKind::HeartbeatTimeout => {
                warn!(
                    transport_id = ?self.current_transport(),
                    "Heartbeat reply missed; forcing reconnect"
                );
                self.schedule_reconnect(now);
            }
            TimerKind::Reconnect => {
                info!("Reconnecting");
                self.connect(None, now);
            }
        }
    }

    /// Writes straight to a ready transport, bypassing the queue.
    fn transmit(&mut self, payload: &str) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        if !transport.handle.is_ready() {
            return false;
        }
        match transport.handle.send(payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(transport_id = %transport.id, error = %e, "Transport write failed");
                false
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            trace!(from = %self.state, to = %state, "State transition");
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

// ============================================================================
// ConnectionManager - Accessors
// ============================================================================

impl ConnectionManager {
    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Handler slot shared with the public channel handle.
    #[must_use]
    pub fn message_handler(&self) -> SharedHandler {
        Arc::clone(&self.handler)
    }

    /// Id of the live transport handle.
    #[inline]
    #[must_use]
    pub fn current_transport(&self) -> Option<TransportId> {
        self.transport.as_ref().map(|transport| transport.id)
    }

    /// Remembered target.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Number of queued outbound payloads.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Pending timers.
    #[inline]
    #[must_use]
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    /// Earliest pending timer deadline.
    #[inline]
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }
}

// ============================================================================
// Tests
// ============================================================================
