//! Type-safe identifiers.
//!
//! Every transport handle opened by the connection manager is tagged with a
//! fresh [`TransportId`]. Events carry the id of the handle that produced
//! them, which lets the manager drop anything emitted by a handle it has
//! already torn down.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// TransportId
// ============================================================================

/// Process-wide counter backing [`TransportId::next`].
static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a single transport handle instance.
///
/// Ids are never reused within a process, so an id that no longer matches the
/// manager's current handle is stale forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    /// Allocates the next unused id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
