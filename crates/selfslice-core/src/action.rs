// ── Action model ──
//
// Actions are the sole mechanism for state mutation. An action belongs
// to a namespace iff its type starts with the namespace prefix; routed
// actions carry the owning instance id in `meta.selfID`.
//
// Deferred dispatch ("thunks") is a tagged variant of `Dispatchable`,
// not a duck-typed callable: the dispatch pipeline pattern-matches on
// the variant.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ident::SelfId;

/// Routing metadata attached to namespaced actions.
///
/// `selfID` addresses the instance slice the action is routed to.
/// Unknown metadata keys are preserved round-trip in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionMeta {
    #[serde(rename = "selfID", default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<SelfId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A plain dispatched action: `{ type, meta?, payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The action type string. Namespace membership is a prefix check
    /// on this field.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ActionMeta>,

    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            meta: None,
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Force-set the routing id, replacing any existing tag.
    pub fn with_self_id(mut self, id: SelfId) -> Self {
        self.meta.get_or_insert_with(ActionMeta::default).self_id = Some(id);
        self
    }

    /// The routing id, if this action carries one.
    pub fn self_id(&self) -> Option<&SelfId> {
        self.meta.as_ref()?.self_id.as_ref()
    }

    pub fn is_tagged(&self) -> bool {
        self.self_id().is_some()
    }

    /// Attach the routing id unless the action already carries one.
    /// An existing tag is never overwritten; other metadata keys are
    /// preserved.
    pub fn tagged(mut self, id: &SelfId) -> Self {
        let meta = self.meta.get_or_insert_with(ActionMeta::default);
        if meta.self_id.is_none() {
            meta.self_id = Some(id.clone());
        }
        self
    }
}

// ── Dispatch pipeline types ─────────────────────────────────────────

/// Cloneable handle into a dispatch pipeline.
#[derive(Clone)]
pub struct Dispatch(Rc<dyn Fn(Dispatchable)>);

impl Dispatch {
    pub fn new(f: impl Fn(Dispatchable) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn send(&self, dispatchable: impl Into<Dispatchable>) {
        (*self.0)(dispatchable.into());
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch")
    }
}

/// A deferred dispatch: runs later with a dispatch handle and may
/// re-enter the pipeline any number of times. Wrapped dispatchers
/// re-wrap the handle they pass in, so async dispatch chains keep the
/// instance tagging of the dispatcher that started them.
pub struct Thunk(Box<dyn FnOnce(Dispatch)>);

impl Thunk {
    pub fn new(f: impl FnOnce(Dispatch) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn run(self, dispatch: Dispatch) {
        (self.0)(dispatch);
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk")
    }
}

/// Everything that can enter the dispatch pipeline.
#[derive(Debug)]
pub enum Dispatchable {
    Plain(Action),
    Deferred(Thunk),
}

impl From<Action> for Dispatchable {
    fn from(action: Action) -> Self {
        Self::Plain(action)
    }
}

impl From<Thunk> for Dispatchable {
    fn from(thunk: Thunk) -> Self {
        Self::Deferred(thunk)
    }
}
