//! WebSocket client transport.
//!
//! [`WsConnector::open`] spawns one tokio task per handle. The task dials the
//! target, reports [`TransportEvent::Open`], then pumps frames both ways
//! until either side closes.
//!
//! # I/O Loop
//!
//! - Incoming text frames → [`TransportEvent::Message`]
//! - Close frame or end of stream → [`TransportEvent::Close`]
//! - Read/write failure → [`TransportEvent::Error`]
//! - Outgoing payloads from [`TransportHandle::send`] → text frames

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{Connector, EventSink, ReadyState, SharedReadyState, TransportEvent, TransportHandle};

// ============================================================================
// WsCommand
// ============================================================================

/// Internal commands for the I/O task.
enum WsCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Close,
}

// ============================================================================
// WsConnector
// ============================================================================

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Requires a running tokio runtime when [`open`](Connector::open) is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a connector.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &Url, sink: EventSink) -> Result<Box<dyn TransportHandle>> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let ready = SharedReadyState::new();

        debug!(transport_id = %sink.id(), %url, "Dialing WebSocket");

        tokio::spawn(run_io_loop(
            url.clone(),
            sink,
            command_rx,
            ready.clone(),
        ));

        Ok(Box::new(WsHandle { command_tx, ready }))
    }
}

// ============================================================================
// WsHandle
// ============================================================================

/// Handle to one WebSocket I/O task. Dropping it closes the socket.
struct WsHandle {
    command_tx: mpsc::UnboundedSender<WsCommand>,
    ready: SharedReadyState,
}

impl TransportHandle for WsHandle {
    fn send(&mut self, payload: &str) -> Result<()> {
        if self.ready.get() != ReadyState::Open {
            return Err(Error::ConnectionClosed);
        }
        self.command_tx
            .send(WsCommand::Send(payload.to_owned()))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn is_ready(&self) -> bool {
        self.ready.get() == ReadyState::Open
    }

    fn close(&mut self) {
        if self.ready.get() != ReadyState::Closed {
            self.ready.set(ReadyState::Closing);
        }
        let _ = self.command_tx.send(WsCommand::Close);
    }
}

impl Drop for WsHandle {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WsCommand::Close);
    }
}

// ============================================================================
// I/O Loop
// ============================================================================

/// Dials the target and pumps frames until either side closes.
async fn run_io_loop(
    url: Url,
    sink: EventSink,
    mut command_rx: mpsc::UnboundedReceiver<WsCommand>,
    ready: SharedReadyState,
) {
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let dialed = loop {
        tokio::select! {
            result = &mut connect => break result,

            command = command_rx.recv() => match command {
                Some(WsCommand::Send(_)) => {
                    warn!(transport_id = %sink.id(), "Dropping payload written before open");
                }
                Some(WsCommand::Close) | None => {
                    debug!(transport_id = %sink.id(), "Dial abandoned");
                    ready.set(ReadyState::Closed);
                    return;
                }
            },
        }
    };

    let ws_stream = match dialed {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            ready.set(ReadyState::Closed);
            sink.emit(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    ready.set(ReadyState::Open);
    sink.emit(TransportEvent::Open);

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(transport_id = %sink.id(), len = text.len(), "Frame received");
                        sink.emit(TransportEvent::Message(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(transport_id = %sink.id(), "WebSocket closed by remote");
                        ready.set(ReadyState::Closed);
                        sink.emit(TransportEvent::Close(frame.map(|f| f.reason.as_str().to_owned())));
                        break;
                    }

                    Some(Err(e)) => {
                        ready.set(ReadyState::Closed);
                        sink.emit(TransportEvent::Error(e.to_string()));
                        break;
                    }

                    None => {
                        debug!(transport_id = %sink.id(), "WebSocket stream ended");
                        ready.set(ReadyState::Closed);
                        sink.emit(TransportEvent::Close(None));
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(WsCommand::Send(payload)) => {
                        if let Err(e) = ws_write.send(Message::Text(payload.into())).await {
                            ready.set(ReadyState::Closed);
                            sink.emit(TransportEvent::Error(e.to_string()));
                            break;
                        }
                    }

                    Some(WsCommand::Close) | None => {
                        let _ = ws_write.close().await;
                        ready.set(ReadyState::Closed);
                        sink.emit(TransportEvent::Close(None));
                        break;
                    }
                }
            }
        }
    }

    debug!(transport_id = %sink.id(), "I/O loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
