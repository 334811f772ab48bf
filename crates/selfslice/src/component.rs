// ── Connected component wrapper ──
//
// Drives the mount / props-update / render / destroy protocol for a
// host that owns the render loop. The wrapper never renders an
// unmounted instance and re-renders only when the derived props handle
// actually changed.

use std::rc::Rc;

use serde_json::{Map, Value};

use selfslice_core::Store;

use crate::binding::Binding;
use crate::dispatch::ActionTriggers;
use crate::error::BindError;
use crate::lifecycle::{Instance, SELF_ID_PROP};

/// What the host renders: incoming props, derived props and the
/// instance's dispatch triggers.
pub trait Render {
    fn render(&mut self, props: &Value, derived: &Value, triggers: &ActionTriggers);
}

/// A render target connected through a [`Binding`].
pub struct Connected<R: Render> {
    instance: Instance,
    target: R,
    props: Value,
    last_derived: Option<Rc<Value>>,
}

impl<R: Render> Connected<R> {
    /// Mount the instance and take ownership of the render target.
    pub fn new(
        binding: &Binding,
        store: &Rc<Store>,
        target: R,
        props: Value,
    ) -> Result<Self, BindError> {
        let instance = binding.attach(store, &props)?;
        Ok(Self {
            instance,
            target,
            props,
            last_derived: None,
        })
    }

    /// Replace the incoming props. A changed `selfID` prop
    /// re-identifies the instance before the next render.
    pub fn props_will_update(&mut self, next: Value) -> Result<(), BindError> {
        self.instance.update_props(&next)?;
        self.props = next;
        Ok(())
    }

    /// Render if the instance is mounted and the derived props changed
    /// since the last render. Returns whether the target rendered.
    pub fn render(&mut self) -> bool {
        let Some(derived) = self.instance.derived_props(&self.props) else {
            return false;
        };
        if let Some(last) = &self.last_derived {
            if Rc::ptr_eq(last, &derived) {
                return false;
            }
        }
        self.last_derived = Some(Rc::clone(&derived));

        let view = self.attach_identity(&derived);
        let shown = view.as_ref().unwrap_or(&derived);
        self.target.render(&self.props, shown, self.instance.triggers());
        true
    }

    /// Render unconditionally (initial render, or the host's own props
    /// changed). Returns whether the instance was mounted.
    pub fn force_render(&mut self) -> bool {
        self.last_derived = None;
        self.render()
    }

    pub fn destroyed(&mut self) {
        self.instance.unmount();
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    fn attach_identity(&self, derived: &Value) -> Option<Value> {
        if !self.instance.attach_self_id() {
            return None;
        }
        let mut view = match derived {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            // Non-object derived props have nowhere to carry the id.
            _ => return None,
        };
        view.insert(
            SELF_ID_PROP.to_owned(),
            Value::String(self.instance.self_id().to_string()),
        );
        Some(Value::Object(view))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binding::{BindSpec, bind};
    use pretty_assertions::assert_eq;
    use selfslice_core::{Action, CombinedReducer, Engine};
    use serde_json::json;

    fn counter(state: Option<&Value>, action: &Action) -> Value {
        let n = state
            .and_then(|s| s.get("count"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if action.kind.ends_with("/INC") {
            json!({ "count": n + 1 })
        } else {
            json!({ "count": n })
        }
    }

    fn store_for(engine: &Rc<Engine>) -> Rc<Store> {
        let root = CombinedReducer::new().with(
            engine.namespace().slice_name().to_owned(),
            engine.slice_reducer(),
        );
        Store::new(root, json!({}))
    }

    #[derive(Default)]
    struct Probe {
        renders: Vec<Value>,
    }

    impl Render for Probe {
        fn render(&mut self, _: &Value, derived: &Value, _: &ActionTriggers) {
            self.renders.push(derived.clone());
        }
    }

    #[test]
    fn renders_carry_the_instance_id_and_the_slice() {
        let engine = Engine::with_defaults();
        let store = store_for(&engine);
        let binding = bind(
            &engine,
            BindSpec::new("Comp").reducer(counter).self_id("A"),
        )
        .unwrap();

        let mut connected =
            Connected::new(&binding, &store, Probe::default(), json!({})).unwrap();
        assert!(connected.render());
        assert_eq!(
            connected.target().renders[0],
            json!({ "count": 0, "selfID": "A" })
        );

        connected.instance().dispatch(Action::new("@@self:Comp/INC"));
        assert!(connected.render());
        assert_eq!(
            connected.target().renders[1],
            json!({ "count": 1, "selfID": "A" })
        );
    }

    #[test]
    fn unchanged_derived_props_skip_the_render() {
        let engine = Engine::with_defaults();
        let store = store_for(&engine);
        let binding = bind(
            &engine,
            BindSpec::new("Comp")
                .reducer(counter)
                .self_id("A")
                .getter(|slice: Option<&Value>, _, _| {
                    slice
                        .and_then(|s| s.get("count"))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .combine(|inputs| json!({ "count": inputs[0] }))
                .attach_self_id(false),
        )
        .unwrap();

        let mut connected =
            Connected::new(&binding, &store, Probe::default(), json!({})).unwrap();
        assert!(connected.render());
        assert!(!connected.render());

        connected.instance().dispatch(Action::new("@@self:Comp/INC"));
        assert!(connected.render());
        assert_eq!(
            connected.target().renders,
            vec![json!({ "count": 0 }), json!({ "count": 1 })]
        );
    }

    #[test]
    fn destroyed_components_never_render_again() {
        let engine = Engine::with_defaults();
        let store = store_for(&engine);
        let binding = bind(
            &engine,
            BindSpec::new("Comp").reducer(counter).self_id("A"),
        )
        .unwrap();

        let mut connected =
            Connected::new(&binding, &store, Probe::default(), json!({})).unwrap();
        connected.destroyed();
        assert!(!connected.render());
        assert!(connected.target().renders.is_empty());
    }

    #[test]
    fn self_id_prop_change_re_identifies_before_rendering() {
        let engine = Engine::with_defaults();
        let store = store_for(&engine);
        let binding = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();

        let mut connected = Connected::new(
            &binding,
            &store,
            Probe::default(),
            json!({ "selfID": "one" }),
        )
        .unwrap();
        connected
            .props_will_update(json!({ "selfID": "two" }))
            .unwrap();

        assert!(connected.render());
        assert_eq!(
            connected.target().renders[0],
            json!({ "count": 0, "selfID": "two" })
        );
        assert_eq!(
            store.snapshot(),
            json!({ "self": { "two": { "count": 0 } } })
        );
    }
}
