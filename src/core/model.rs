// ChatLog - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no threading.
//
// These types are the shared vocabulary across all layers.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Message
// =============================================================================

/// A single chat message. Immutable once created.
///
/// Two messages are the same item when both `timestamp` and `text` match;
/// there are no other fields, so item identity and content equality coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Message body as submitted by the producer (already trimmed by the caller).
    pub text: String,

    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn new(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Render the creation time in the local time zone using a chrono
    /// format string (e.g. `"%H:%M"`).
    ///
    /// Returns an empty string if the timestamp is outside chrono's range or
    /// the format string is invalid.
    pub fn time_label(&self, format: &str) -> String {
        use std::fmt::Write;

        let Some(dt) = Local.timestamp_millis_opt(self.timestamp).single() else {
            return String::new();
        };
        let mut label = String::new();
        match write!(label, "{}", dt.format(format)) {
            Ok(()) => label,
            Err(_) => String::new(),
        }
    }
}

// =============================================================================
// Change version
// =============================================================================

/// The store's change signal.
///
/// `seq` increases by one on every append and is what subscribers compare.
/// `updated_at_ms` is the wall-clock time of the most recent append, never
/// decreasing even if the clock steps backwards.
///
/// A new value means "re-read the full snapshot", never "apply a delta".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ChangeVersion {
    pub seq: u64,
    pub updated_at_ms: i64,
}

impl ChangeVersion {
    /// The version of a store that has never been appended to.
    pub const INITIAL: ChangeVersion = ChangeVersion {
        seq: 0,
        updated_at_ms: 0,
    };

    /// Version following `self` for an append observed at `now_ms`.
    pub fn next(self, now_ms: i64) -> Self {
        Self {
            seq: self.seq + 1,
            updated_at_ms: now_ms.max(self.updated_at_ms),
        }
    }
}

impl std::fmt::Display for ChangeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}@{}", self.seq, self.updated_at_ms)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable, ordered copy of the messages retained at one change version.
///
/// Cloning is O(1); the message list is shared and never mutated after the
/// snapshot is taken.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    messages: Arc<Vec<Message>>,
    version: ChangeVersion,
}

impl Snapshot {
    pub fn new(messages: Arc<Vec<Message>>, version: ChangeVersion) -> Self {
        Self { messages, version }
    }

    /// Build a snapshot from owned messages (mostly for tests and tools).
    pub fn from_messages(messages: Vec<Message>, version: ChangeVersion) -> Self {
        Self::new(Arc::new(messages), version)
    }

    pub fn version(&self) -> ChangeVersion {
        self.version
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    /// Whether both snapshots share the same underlying message list.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
    }
}

impl std::ops::Deref for Snapshot {
    type Target = [Message];

    fn deref(&self) -> &[Message] {
        self.messages.as_slice()
    }
}
