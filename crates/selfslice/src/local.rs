// ── Local variant ──
//
// Same reducer / selector / trigger surface as the global binding, but
// the state lives inside the instance instead of a shared store. There
// is no registry, no namespacing and no lifecycle routing: the reducer
// is the only one and sees every dispatched action.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use selfslice_core::{Action, Dispatch, Dispatchable, InstanceReducer, ListenerId};

use crate::binding::{BindSpec, Selection, resolve_selection};
use crate::dispatch::{ActionTriggers, build_triggers, DispatchMap};
use crate::error::BindError;
use crate::selector::InstanceSelector;

/// The synthetic action a local reducer receives to produce its
/// initial state.
pub const LOCAL_INIT_ACTION: &str = "@SELF_INIT";

/// Validated description of a locally-bound component type.
pub struct LocalBinding {
    reducer: InstanceReducer,
    selection: Selection,
    dispatch_map: Option<DispatchMap>,
}

impl LocalBinding {
    /// Local bindings require a reducer (there is nothing to select
    /// from otherwise) and cannot denormalize (there is no shared
    /// entity database).
    pub fn new(spec: BindSpec) -> Result<Self, BindError> {
        if spec.denormalize.is_some() {
            return Err(BindError::LocalDenormalize);
        }
        let Some(reducer) = spec.reducer else {
            return Err(BindError::MissingReducer);
        };
        let selection = resolve_selection(spec.pick, spec.getters, spec.combine, true)?;
        Ok(Self {
            reducer,
            selection,
            dispatch_map: spec.dispatch_map,
        })
    }

    pub fn attach(&self) -> Rc<LocalInstance> {
        LocalInstance::new(self)
    }
}

impl fmt::Debug for LocalBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBinding").finish_non_exhaustive()
    }
}

/// One instance with self-contained state.
pub struct LocalInstance {
    reducer: InstanceReducer,
    state: RefCell<Value>,
    selector: InstanceSelector,
    triggers: RefCell<ActionTriggers>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
    next_listener: Cell<ListenerId>,
}

impl LocalInstance {
    fn new(binding: &LocalBinding) -> Rc<Self> {
        let initial = (*binding.reducer)(None, &Action::new(LOCAL_INIT_ACTION));
        let instance = Rc::new(Self {
            reducer: Rc::clone(&binding.reducer),
            state: RefCell::new(initial),
            selector: binding.selection.instantiate(),
            triggers: RefCell::new(ActionTriggers::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        });

        // Triggers need a dispatch handle into the instance, so they
        // are built after the Rc exists.
        if let Some(map) = &binding.dispatch_map {
            let dispatch = instance.dispatcher();
            *instance.triggers.borrow_mut() = build_triggers(map, &dispatch, &Value::Null);
        }
        instance
    }

    /// A dispatch handle into this instance. Holds only a weak
    /// reference, so triggers captured by long-lived callbacks do not
    /// keep a destroyed instance alive.
    pub fn dispatcher(self: &Rc<Self>) -> Dispatch {
        let weak = Rc::downgrade(self);
        Dispatch::new(move |dispatchable| {
            if let Some(instance) = weak.upgrade() {
                instance.dispatch(dispatchable);
            }
        })
    }

    /// Synchronous dispatch into the local state.
    pub fn dispatch(self: &Rc<Self>, dispatchable: impl Into<Dispatchable>) {
        match dispatchable.into() {
            Dispatchable::Plain(action) => {
                let next = {
                    let state = self.state.borrow();
                    (*self.reducer)(Some(&state), &action)
                };
                *self.state.borrow_mut() = next;
                self.notify();
            }
            Dispatchable::Deferred(thunk) => thunk.run(self.dispatcher()),
        }
    }

    pub fn state(&self) -> Value {
        self.state.borrow().clone()
    }

    /// Derived props over the local state. There is no global tree
    /// here; getters receive `Null` for it.
    pub fn derived_props(&self, props: &Value) -> Rc<Value> {
        let state = self.state.borrow();
        self.selector.select(Some(&state), &Value::Null, props)
    }

    pub fn triggers(&self) -> ActionTriggers {
        self.triggers.borrow().clone()
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

impl fmt::Debug for LocalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalInstance")
            .field("listeners", &self.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}
