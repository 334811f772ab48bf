// selfslice-core: engine that lets many instances of a reusable component
// each own an isolated, addressable slice of one shared state tree.

pub mod action;
pub mod engine;
pub mod entities;
pub mod error;
pub mod ident;
pub mod namespace;
pub mod reducer;
pub mod registry;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{Action, ActionMeta, Dispatch, Dispatchable, Thunk};
pub use engine::{Engine, EngineConfig};
pub use entities::{DenormalizeFn, EntitiesGetter, Schema, denormalize};
pub use error::{ConfigError, DuplicateIdentityError};
pub use ident::SelfId;
pub use namespace::Namespace;
pub use reducer::{FnReducer, Reducer, SliceReducer, from_fn};
pub use registry::{InstanceReducer, Registry};
pub use store::{CombinedReducer, ListenerId, Store};
