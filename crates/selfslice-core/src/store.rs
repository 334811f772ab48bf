// ── Reference store ──
//
// Synchronous, single-threaded store over a JSON state tree. Dispatch
// runs the root reducer to completion and notifies subscribers before
// returning; deferred dispatchables re-enter through the store's own
// dispatch handle. Hosts with their own store only need to honor the
// same contract: mount the slice reducer under the configured slice
// name and notify after each dispatch.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::action::{Action, Dispatch, Dispatchable};
use crate::reducer::Reducer;

pub type ListenerId = u64;

/// Single-threaded synchronous store holding the global state tree.
pub struct Store {
    reducer: Box<dyn Reducer>,
    state: RefCell<Value>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
    next_listener: Cell<ListenerId>,
}

impl Store {
    pub fn new(reducer: impl Reducer + 'static, initial: Value) -> Rc<Self> {
        Rc::new(Self {
            reducer: Box::new(reducer),
            state: RefCell::new(initial),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        })
    }

    /// Borrow the current state. The borrow must not be held across a
    /// dispatch.
    pub fn state(&self) -> Ref<'_, Value> {
        self.state.borrow()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Value {
        self.state.borrow().clone()
    }

    /// Dispatch synchronously: the new state is visible and all
    /// subscribers have run by the time this returns. A `Deferred`
    /// dispatchable runs immediately with this store's dispatch handle
    /// and may re-enter dispatch any number of times.
    pub fn dispatch(self: &Rc<Self>, dispatchable: impl Into<Dispatchable>) {
        match dispatchable.into() {
            Dispatchable::Plain(action) => self.dispatch_plain(&action),
            Dispatchable::Deferred(thunk) => thunk.run(self.dispatcher()),
        }
    }

    fn dispatch_plain(&self, action: &Action) {
        let next = {
            let state = self.state.borrow();
            match self.reducer.reduce(&state, action) {
                std::borrow::Cow::Borrowed(_) => None,
                std::borrow::Cow::Owned(value) => Some(value),
            }
        };
        if let Some(next) = next {
            *self.state.borrow_mut() = next;
        }
        self.notify();
    }

    /// A dispatch handle bound to this store.
    pub fn dispatcher(self: &Rc<Self>) -> Dispatch {
        let store = Rc::clone(self);
        Dispatch::new(move |dispatchable| store.dispatch(dispatchable))
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn notify(&self) {
        // Snapshot the listener list so subscribers may subscribe or
        // unsubscribe from within their callback.
        let listeners: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, f)| Rc::clone(f))
            .collect();
        for listener in listeners {
            (*listener)();
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

// ── Combined reducer ────────────────────────────────────────────────

/// Mounts named child reducers over an object state tree; how the host
/// puts the slice reducer at `state[slice_name]`. Keys without a child
/// reducer pass through untouched, and the combined result stays
/// `Cow::Borrowed` when no child changed.
#[derive(Default)]
pub struct CombinedReducer {
    children: Vec<(String, Box<dyn Reducer>)>,
}

impl CombinedReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        self.children.push((name.into(), Box::new(reducer)));
        self
    }
}

impl Reducer for CombinedReducer {
    fn reduce<'a>(&self, state: &'a Value, action: &Action) -> std::borrow::Cow<'a, Value> {
        let null = Value::Null;
        let mut changed: Vec<(usize, Value)> = Vec::new();

        for (index, (name, reducer)) in self.children.iter().enumerate() {
            let child = state.get(name.as_str()).unwrap_or(&null);
            if let std::borrow::Cow::Owned(next) = reducer.reduce(child, action) {
                changed.push((index, next));
            }
        }

        if changed.is_empty() {
            return std::borrow::Cow::Borrowed(state);
        }

        let mut next = match state {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (index, value) in changed {
            next.insert(self.children[index].0.clone(), value);
        }
        std::borrow::Cow::Owned(Value::Object(next))
    }
}
