// ── Dispatch wrapping and action triggers ──
//
// A scoped binding never hands its component the raw store dispatch.
// It hands a wrapped one that stamps the instance id onto every action
// belonging to the namespace, so component code dispatches as if it
// were the only instance in the world.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use selfslice_core::{Dispatch, Dispatchable, Namespace, SelfId, Thunk};

/// Builds a dispatchable from trigger arguments.
pub type ActionCreator = Rc<dyn Fn(Value) -> Dispatchable>;

/// A named dispatch callback bound to one instance.
pub type Trigger = Rc<dyn Fn(Value)>;

/// The dispatch callbacks a binding exposes to its component.
#[derive(Clone, Default)]
pub struct ActionTriggers {
    triggers: IndexMap<String, Trigger>,
}

impl ActionTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, trigger: impl Fn(Value) + 'static) {
        self.triggers.insert(name.into(), Rc::new(trigger));
    }

    /// Invoke the named trigger. A missing name is reported and
    /// ignored; returns whether a trigger ran.
    pub fn call(&self, name: &str, args: Value) -> bool {
        match self.triggers.get(name) {
            Some(trigger) => {
                (**trigger)(args);
                true
            }
            None => {
                warn!(trigger = name, "no dispatch trigger with this name");
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Trigger> {
        self.triggers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.triggers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl fmt::Debug for ActionTriggers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.triggers.keys()).finish()
    }
}

/// How a binding derives its [`ActionTriggers`].
#[derive(Clone)]
pub enum DispatchMap {
    /// Named action creators; each becomes a trigger that dispatches
    /// the creator's result.
    Creators(IndexMap<String, ActionCreator>),
    /// A free-form factory over the instance's dispatch handle and the
    /// incoming props.
    Factory(Rc<dyn Fn(&Dispatch, &Value) -> ActionTriggers>),
}

impl fmt::Debug for DispatchMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creators(map) => f.debug_set().entries(map.keys()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

pub(crate) fn build_triggers(
    map: &DispatchMap,
    dispatch: &Dispatch,
    props: &Value,
) -> ActionTriggers {
    match map {
        DispatchMap::Factory(factory) => (**factory)(dispatch, props),
        DispatchMap::Creators(creators) => {
            let mut triggers = ActionTriggers::new();
            for (name, creator) in creators {
                let creator = Rc::clone(creator);
                let dispatch = dispatch.clone();
                triggers.insert(name.clone(), move |args| dispatch.send((*creator)(args)));
            }
            triggers
        }
    }
}

/// Wrap a dispatch handle so that every action owned by `namespace`
/// carries the instance id from `id` in `meta.selfID`.
///
/// The id cell is read at dispatch time, not at wrap time, so a
/// re-identified instance keeps tagging with its current id. Actions
/// already tagged and foreign actions pass through untouched. Deferred
/// dispatchables are re-wrapped: the dispatch handle the thunk
/// eventually receives is itself wrapped, so whole async chains stay
/// scoped to the instance that started them.
pub fn wrap_dispatch(inner: Dispatch, namespace: Namespace, id: Rc<RefCell<SelfId>>) -> Dispatch {
    Dispatch::new(move |dispatchable| match dispatchable {
        Dispatchable::Plain(action) => {
            if namespace.owns(&action) {
                let current = id.borrow().clone();
                inner.send(action.tagged(&current));
            } else {
                inner.send(action);
            }
        }
        Dispatchable::Deferred(thunk) => {
            let namespace = namespace.clone();
            let id = Rc::clone(&id);
            inner.send(Thunk::new(move |raw| {
                thunk.run(wrap_dispatch(raw, namespace, id));
            }));
        }
    })
}
