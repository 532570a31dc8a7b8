//! Shared test utilities.
//!
//! Provides a recording in-memory transport and tracing setup used by the
//! integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use resilient_ws::{Connector, EventSink, Result, TransportEvent, TransportHandle, TransportId};
use tracing_subscriber::EnvFilter;
use url::Url;

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honouring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Recording Transport
// ============================================================================

/// Everything the in-memory transport observed.
#[derive(Default)]
pub struct Record {
    pub opened: Vec<String>,
    pub sinks: Vec<EventSink>,
    pub sent: Vec<String>,
    pub closed: Vec<TransportId>,
    ready: Vec<TransportId>,
}

/// Connector whose handles are driven by the test through their sinks.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    record: Arc<Mutex<Record>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        self.record.lock().opened.len()
    }

    /// Payloads written to any handle, in order.
    pub fn sent(&self) -> Vec<String> {
        self.record.lock().sent.clone()
    }

    /// Ids of handles the manager closed.
    pub fn closed(&self) -> Vec<TransportId> {
        self.record.lock().closed.clone()
    }

    /// Sink of the most recently opened handle.
    pub fn latest(&self) -> EventSink {
        self.record
            .lock()
            .sinks
            .last()
            .cloned()
            .expect("no handle opened yet")
    }

    /// Marks the latest handle ready and emits `Open` on it.
    pub fn open_latest(&self) {
        let sink = self.latest();
        self.record.lock().ready.push(sink.id());
        sink.emit(TransportEvent::Open);
    }

    /// Emits an event on the latest handle.
    pub fn emit(&self, event: TransportEvent) {
        let sink = self.latest();
        if matches!(event, TransportEvent::Close(_) | TransportEvent::Error(_)) {
            self.record.lock().ready.retain(|id| *id != sink.id());
        }
        sink.emit(event);
    }
}

struct MemoryHandle {
    id: TransportId,
    record: Arc<Mutex<Record>>,
}

impl TransportHandle for MemoryHandle {
    fn send(&mut self, payload: &str) -> Result<()> {
        let mut record = self.record.lock();
        if !record.ready.contains(&self.id) {
            return Err(resilient_ws::Error::ConnectionClosed);
        }
        record.sent.push(payload.to_owned());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.record.lock().ready.contains(&self.id)
    }

    fn close(&mut self) {
        let mut record = self.record.lock();
        record.ready.retain(|id| *id != self.id);
        record.closed.push(self.id);
    }
}

impl Connector for MemoryTransport {
    fn open(&self, url: &Url, sink: EventSink) -> Result<Box<dyn TransportHandle>> {
        let mut record = self.record.lock();
        record.opened.push(url.to_string());
        record.sinks.push(sink.clone());
        Ok(Box::new(MemoryHandle {
            id: sink.id(),
            record: Arc::clone(&self.record),
        }))
    }
}

/// Connector for a platform without transport support.
pub struct NoTransport;

impl Connector for NoTransport {
    fn is_supported(&self) -> bool {
        false
    }

    fn open(&self, _url: &Url, _sink: EventSink) -> Result<Box<dyn TransportHandle>> {
        Err(resilient_ws::Error::Unsupported)
    }
}
