// ── Instance lifecycle ──
//
// One Instance per mounted component. Mounting registers the reducer
// and dispatches the mount lifecycle action, so the slice exists
// before the first render reads it. Unmounting runs the reverse in
// reverse order. Re-identification (the `selfID` prop changed while
// mounted) is an unmount of the old identity followed by a mount of
// the new one against the same instance object.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use selfslice_core::{Dispatch, Dispatchable, Engine, InstanceReducer, SelfId, Store};

use crate::binding::Binding;
use crate::denormalize::DenormMemo;
use crate::dispatch::{ActionTriggers, build_triggers, wrap_dispatch};
use crate::error::BindError;
use crate::selector::InstanceSelector;

/// Props key that pins an instance to an explicit identity.
pub const SELF_ID_PROP: &str = "selfID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Mounted,
    Unmounted,
}

/// One live attachment of a [`Binding`] to a store.
pub struct Instance {
    engine: Rc<Engine>,
    store: Rc<Store>,
    reducer: Option<InstanceReducer>,
    id: Rc<RefCell<SelfId>>,
    phase: Cell<Phase>,
    selector: InstanceSelector,
    denorm: Option<DenormMemo>,
    dispatch: Dispatch,
    triggers: ActionTriggers,
    attach_self_id: bool,
}

impl Instance {
    pub(crate) fn mount(
        binding: &Binding,
        store: &Rc<Store>,
        props: &Value,
    ) -> Result<Self, BindError> {
        let engine = Rc::clone(&binding.engine);
        let self_id = binding.resolve_id(props);
        let id = Rc::new(RefCell::new(self_id.clone()));

        // Scoped instances register before the mount action fires, so
        // the routed mount action finds its reducer. Stateless ones
        // keep the raw dispatch and skip the lifecycle entirely.
        let dispatch = if let Some(reducer) = &binding.reducer {
            engine
                .registry()
                .register(self_id.clone(), Rc::clone(reducer))?;
            wrap_dispatch(store.dispatcher(), engine.namespace().clone(), Rc::clone(&id))
        } else {
            store.dispatcher()
        };

        let triggers = match &binding.dispatch_map {
            Some(map) => build_triggers(map, &dispatch, props),
            None => ActionTriggers::new(),
        };

        let instance = Self {
            engine,
            store: Rc::clone(store),
            reducer: binding.reducer.clone(),
            id,
            phase: Cell::new(Phase::Mounted),
            selector: binding.selection.instantiate(),
            denorm: binding.denormalize.clone().map(DenormMemo::new),
            dispatch,
            triggers,
            attach_self_id: binding.attach_self_id,
        };

        if instance.reducer.is_some() {
            let mount = instance.engine.namespace().mount_action(&self_id);
            instance.store.dispatch(mount);
            debug!(self_id = %self_id, "instance mounted");
        }
        Ok(instance)
    }

    /// Tear the instance down: the unmount action removes the slice,
    /// then the identity is released for reuse. Safe to call more than
    /// once.
    pub fn unmount(&self) {
        if self.phase.get() == Phase::Unmounted {
            return;
        }
        self.phase.set(Phase::Unmounted);
        if self.reducer.is_some() {
            let id = self.id.borrow().clone();
            self.store
                .dispatch(self.engine.namespace().unmount_action(&id));
            self.engine.registry().unregister(&id);
            debug!(self_id = %id, "instance unmounted");
        }
    }

    /// React to a props change: a differing `selfID` prop re-identifies
    /// the instance. All other props changes are the caller's concern
    /// (pass the new props to [`derived_props`](Self::derived_props)).
    pub fn update_props(&self, next: &Value) -> Result<(), BindError> {
        let Some(incoming) = next.get(SELF_ID_PROP).and_then(Value::as_str) else {
            return Ok(());
        };
        let changed = *self.id.borrow() != SelfId::from(incoming);
        if changed {
            self.reidentify(SelfId::from(incoming))?;
        }
        Ok(())
    }

    fn reidentify(&self, new_id: SelfId) -> Result<(), BindError> {
        if self.phase.get() == Phase::Unmounted {
            return Ok(());
        }
        let Some(reducer) = &self.reducer else {
            *self.id.borrow_mut() = new_id;
            return Ok(());
        };

        let old = self.id.borrow().clone();
        self.store
            .dispatch(self.engine.namespace().unmount_action(&old));
        self.engine.registry().unregister(&old);

        // If the new identity is taken the instance stays down rather
        // than half-mounted under the old id.
        if let Err(err) = self
            .engine
            .registry()
            .register(new_id.clone(), Rc::clone(reducer))
        {
            self.phase.set(Phase::Unmounted);
            return Err(err.into());
        }

        *self.id.borrow_mut() = new_id.clone();
        self.store
            .dispatch(self.engine.namespace().mount_action(&new_id));
        debug!(old_id = %old, new_id = %new_id, "instance re-identified");
        Ok(())
    }

    /// Derived props for a render pass, or `None` when the instance is
    /// unmounted (render must be skipped, not fed stale state).
    ///
    /// Unchanged inputs yield a reference-equal `Rc`, so callers can
    /// skip re-rendering with a pointer comparison.
    pub fn derived_props(&self, props: &Value) -> Option<Rc<Value>> {
        if self.phase.get() == Phase::Unmounted {
            return None;
        }
        let id = self.id.borrow().clone();
        let state = self.store.state();
        let slice = if self.reducer.is_some() {
            self.engine.instance_slice(&state, &id)
        } else {
            None
        };
        let base = self.selector.select(slice, &state, props);
        let out = match &self.denorm {
            Some(denorm) => {
                let db = self.engine.entities(&state);
                denorm.apply(&self.engine, base, db)
            }
            None => base,
        };
        Some(out)
    }

    /// Dispatch through this instance's (possibly wrapped) handle.
    pub fn dispatch(&self, dispatchable: impl Into<Dispatchable>) {
        self.dispatch.send(dispatchable);
    }

    /// A clone of the instance's dispatch handle, for handing to
    /// callbacks.
    pub fn dispatcher(&self) -> Dispatch {
        self.dispatch.clone()
    }

    pub fn self_id(&self) -> SelfId {
        self.id.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.phase.get() == Phase::Mounted
    }

    pub fn triggers(&self) -> &ActionTriggers {
        &self.triggers
    }

    pub(crate) fn attach_self_id(&self) -> bool {
        self.attach_self_id
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("self_id", &*self.id.borrow())
            .field("phase", &self.phase.get())
            .field("scoped", &self.reducer.is_some())
            .finish_non_exhaustive()
    }
}
