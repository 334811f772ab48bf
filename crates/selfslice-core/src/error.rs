// ── Core error types ──
//
// Configuration errors fail fast at construction time. Identity
// conflicts are hard failures: two live instances racing to own the
// same id is a caller bug, not a recoverable runtime condition.
// Malformed routed actions are deliberately NOT errors here -- the
// slice reducer reports them through tracing and keeps running.

use thiserror::Error;

use crate::ident::SelfId;

/// Configuration-surface errors, raised synchronously while building
/// namespaces, engines, or bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{what} \"{value}\" has invalid format")]
    InvalidName { what: &'static str, value: String },
}

/// Raised when registering an id that is already held by a live
/// instance. Registration fails before any registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("self id \"{id}\" is already registered")]
pub struct DuplicateIdentityError {
    pub id: SelfId,
}
