// selfslice: instance-scoped state binding over a shared store.
//
// A binding describes how one reusable component type connects: a
// per-instance reducer, a memoized selection, optional entity
// denormalization and named dispatch triggers. Attaching a binding
// mounts one instance whose slice lives at `state[slice][selfID]` and
// whose dispatches are tagged with its identity; the local variant
// offers the same surface over instance-private state.

pub mod binding;
pub mod component;
pub mod denormalize;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod local;
pub mod selector;

// ── Primary re-exports ──────────────────────────────────────────────
pub use binding::{BindSpec, Binding, bind};
pub use component::{Connected, Render};
pub use denormalize::{CustomDenormalize, Denormalize};
pub use dispatch::{ActionCreator, ActionTriggers, DispatchMap, Trigger, wrap_dispatch};
pub use error::BindError;
pub use lifecycle::{Instance, SELF_ID_PROP};
pub use local::{LOCAL_INIT_ACTION, LocalBinding, LocalInstance};
pub use selector::{Combiner, Getter, MemoSelector, PickFactory, PickedSelector};

// The engine layer, re-exported so most hosts depend on this crate
// alone.
pub use selfslice_core::{
    Action, ActionMeta, CombinedReducer, ConfigError, Dispatch, Dispatchable,
    DuplicateIdentityError, Engine, EngineConfig, FnReducer, InstanceReducer, ListenerId,
    Namespace, Reducer, Registry, Schema, SelfId, SliceReducer, Store, Thunk, from_fn,
};
