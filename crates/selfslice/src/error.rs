// ── Binding-layer errors ──
//
// Everything here surfaces at binding construction or attach time;
// nothing in the dispatch path itself throws.

use thiserror::Error;

use selfslice_core::{ConfigError, DuplicateIdentityError};

/// Errors from building or attaching a binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pick() is mutually exclusive with getters/combine")]
    ConflictingSelection,

    #[error(
        "binding needs a selector: provide getters + combine, pick(), \
         or a reducer for the identity default"
    )]
    MissingSelector,

    #[error("local bindings require a reducer")]
    MissingReducer,

    #[error("denormalize is not supported for local bindings")]
    LocalDenormalize,

    #[error(transparent)]
    DuplicateIdentity(#[from] DuplicateIdentityError),
}
