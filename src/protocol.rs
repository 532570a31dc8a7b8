//! Wire-level conventions carried over the channel.
//!
//! | Payload | Direction | Meaning |
//! |---------|-----------|---------|
//! | `ping` | Local → Remote | Liveness probe |
//! | `pong` | Remote → Local | Liveness reply |
//! | anything else | Remote → Local | JSON application data |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Liveness probe payload.
pub const PING: &str = "ping";

/// Liveness reply payload.
pub const PONG: &str = "pong";

// ============================================================================
// Incoming
// ============================================================================

/// Classification of a received text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// Reply to a liveness probe.
    Pong,
    /// Application payload, not yet decoded.
    Data(&'a str),
}

impl<'a> Incoming<'a> {
    /// Classifies a received payload.
    #[inline]
    #[must_use]
    pub fn classify(payload: &'a str) -> Self {
        if payload == PONG {
            Self::Pong
        } else {
            Self::Data(payload)
        }
    }
}

/// Decodes an application payload into a structured value.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if the payload is not valid JSON.
pub fn decode(payload: &str) -> Result<Value> {
    Ok(serde_json::from_str(payload)?)
}

// ============================================================================
// Tests
// ============================================================================
