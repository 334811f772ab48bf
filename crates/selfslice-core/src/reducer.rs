// ── Reducers and the slice demultiplexer ──
//
// `Reducer` returns `Cow::Borrowed` for the unchanged fast path, so
// "same state reference" is observable and cheap -- most actions in
// the system are foreign to this mechanism.

use std::borrow::Cow;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{error, trace};

use crate::action::Action;
use crate::engine::Engine;

/// A pure state transition over one subtree of the global state.
pub trait Reducer {
    /// `Cow::Borrowed` means the state is unchanged (same reference);
    /// `Cow::Owned` carries the replacement.
    fn reduce<'a>(&self, state: &'a Value, action: &Action) -> Cow<'a, Value>;
}

/// Adapter turning a plain function into a [`Reducer`].
pub struct FnReducer<F>(F);

impl<F> Reducer for FnReducer<F>
where
    F: for<'a> Fn(&'a Value, &Action) -> Cow<'a, Value>,
{
    fn reduce<'a>(&self, state: &'a Value, action: &Action) -> Cow<'a, Value> {
        (self.0)(state, action)
    }
}

/// Wrap a function as a [`Reducer`].
pub fn from_fn<F>(f: F) -> FnReducer<F>
where
    F: for<'a> Fn(&'a Value, &Action) -> Cow<'a, Value>,
{
    FnReducer(f)
}

// ── Slice reducer ───────────────────────────────────────────────────

/// The single reducer the host mounts under the configured slice name.
///
/// Demultiplexes every namespaced action to the registered reducer for
/// its instance id, removes the instance key on unmount, and drops
/// actions for ids with no registered reducer (the expected race
/// between async dispatch and unmount).
pub struct SliceReducer {
    engine: Rc<Engine>,
}

impl SliceReducer {
    pub(crate) fn new(engine: Rc<Engine>) -> Self {
        Self { engine }
    }
}

impl Reducer for SliceReducer {
    fn reduce<'a>(&self, state: &'a Value, action: &Action) -> Cow<'a, Value> {
        let namespace = self.engine.namespace();

        // Fast path: foreign action.
        if !namespace.owns(action) {
            return Cow::Borrowed(state);
        }

        // Namespaced actions must carry a routing id. Missing one is a
        // reportable condition, not a fatal error.
        let Some(self_id) = action.self_id() else {
            error!(
                action_type = %action.kind,
                "namespaced action is missing meta.selfID; state left unchanged"
            );
            return Cow::Borrowed(state);
        };

        if action.kind == namespace.unmount_type() {
            if state.get(self_id.as_str()).is_none() {
                return Cow::Borrowed(state);
            }
            let mut next = to_slice_map(state);
            next.remove(self_id.as_str());
            return Cow::Owned(Value::Object(next));
        }

        // No reducer registered: the instance unmounted (or never
        // mounted) while this action was in flight. Drop it.
        let Some(reducer) = self.engine.registry().get(self_id) else {
            trace!(
                action_type = %action.kind,
                self_id = %self_id,
                "no reducer registered for id; dropping routed action"
            );
            return Cow::Borrowed(state);
        };

        let reduced = (*reducer)(state.get(self_id.as_str()), action);
        let mut next = to_slice_map(state);
        next.insert(self_id.as_str().to_owned(), reduced);
        Cow::Owned(Value::Object(next))
    }
}

fn to_slice_map(state: &Value) -> Map<String, Value> {
    match state {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}
