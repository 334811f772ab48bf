// ── Instance identity ──
//
// SelfId is the unique address of one live component instance's slice.
// Ids are either caller-supplied (stable across remounts) or generated
// from engine-wide monotonic ordinals that are never reused, so
// sequential auto-generated ids cannot collide even after a remount.

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier of one mounted component instance.
///
/// At most one live instance may hold a given id at any point in time;
/// the [`Registry`](crate::Registry) enforces this on registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelfId(String);

impl SelfId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SelfId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SelfId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Ordinal generator ───────────────────────────────────────────────

/// Monotonic ordinal source for auto-generated instance ids.
///
/// Ordinals start at 1 and are never reused within the lifetime of the
/// owning engine. Single-threaded by design (see the concurrency model
/// in the crate docs), hence `Cell` rather than an atomic.
#[derive(Debug, Default)]
pub(crate) struct IdGenerator {
    last: Cell<u64>,
}

impl IdGenerator {
    pub(crate) fn next_ordinal(&self) -> u64 {
        let next = self.last.get() + 1;
        self.last.set(next);
        next
    }
}
