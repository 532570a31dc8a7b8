//! Outbound message buffer.
//!
//! Holds payloads written while the channel is not open. The buffer is
//! unbounded; backpressure belongs to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of payloads waiting for an open transport.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    messages: VecDeque<String>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }

    /// Appends a payload at the tail.
    #[inline]
    pub fn enqueue(&mut self, message: String) {
        self.messages.push_back(message);
    }

    /// Hands every queued payload to `sink` in FIFO order and leaves the
    /// queue empty. Returns how many were forwarded.
    ///
    /// Only the payloads present when the drain starts are forwarded.
    pub fn drain_to(&mut self, mut sink: impl FnMut(String)) -> usize {
        let pending = std::mem::take(&mut self.messages);
        let count = pending.len();
        pending.into_iter().for_each(&mut sink);
        count
    }

    /// Number of queued payloads.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates queued payloads from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
