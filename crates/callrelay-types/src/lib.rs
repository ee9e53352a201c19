//! Shared types and the pure normalization layer for the call relay.
//!
//! Upstream webhooks describe calls with whatever key names their producer
//! happened to pick (`id` vs `conversation_id` vs `_id`, unix seconds vs ISO
//! strings, and so on). This crate maps those loosely-structured records into
//! one fixed shape, [`CanonicalCallRecord`], that the relay serves to clients.
//!
//! Everything here is pure: no I/O, no shared state, and no failure modes.
//! Missing or unparseable input degrades to placeholders instead of errors.

pub mod normalize;
pub mod time;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use normalize::{normalize_item, normalize_response};

/// Placeholder rendered for any field with no usable source value.
pub const PLACEHOLDER: &str = "-";

/// The only fixed-shape record the relay produces.
///
/// Every field is always present when serialized. Absent source data shows up
/// as `null` (for `id`) or [`PLACEHOLDER`] (for everything else), never as an
/// omitted key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCallRecord {
    /// Identifier used to fetch the call's audio. `null` when no known id key
    /// was present.
    pub id: Value,
    /// Human-readable timestamp, the original string if it could not be
    /// parsed, or [`PLACEHOLDER`].
    pub time: String,
    /// Caller identity.
    pub from: Value,
    /// Callee or agent identity.
    pub to: Value,
    /// Call length, passed through as the upstream sent it (string or number).
    pub duration: Value,
}

impl Default for CanonicalCallRecord {
    fn default() -> Self {
        Self {
            id: Value::Null,
            time: PLACEHOLDER.to_string(),
            from: Value::from(PLACEHOLDER),
            to: Value::from(PLACEHOLDER),
            duration: Value::from(PLACEHOLDER),
        }
    }
}
