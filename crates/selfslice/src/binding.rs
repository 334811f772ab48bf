// ── Binding construction ──
//
// A Binding is the validated, reusable description of how one
// component type connects: its reducer, its selection, its dispatch
// map and its identity policy. Attaching the binding to a store yields
// one Instance per mounted component.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use selfslice_core::namespace::validate_component_name;
use selfslice_core::{Action, Dispatch, Dispatchable, Engine, InstanceReducer, SelfId, Store};

use crate::denormalize::Denormalize;
use crate::dispatch::{ActionCreator, ActionTriggers, DispatchMap};
use crate::error::BindError;
use crate::lifecycle::{Instance, SELF_ID_PROP};
use crate::selector::{Combiner, Getter, InstanceSelector, MemoSelector, PickFactory, PickedSelector};

/// Builder describing one component type's connection.
pub struct BindSpec {
    pub(crate) self_id: Option<SelfId>,
    pub(crate) display_name: String,
    pub(crate) reducer: Option<InstanceReducer>,
    pub(crate) getters: Vec<Getter>,
    pub(crate) combine: Option<Combiner>,
    pub(crate) pick: Option<PickFactory>,
    pub(crate) denormalize: Option<Denormalize>,
    pub(crate) dispatch_map: Option<DispatchMap>,
    pub(crate) attach_self_id: bool,
}

impl BindSpec {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            self_id: None,
            display_name: display_name.into(),
            reducer: None,
            getters: Vec::new(),
            combine: None,
            pick: None,
            denormalize: None,
            dispatch_map: None,
            attach_self_id: true,
        }
    }

    /// Fix the instance id for every attach of this binding. With a
    /// fixed id at most one instance can be mounted at a time.
    pub fn self_id(mut self, id: impl Into<SelfId>) -> Self {
        self.self_id = Some(id.into());
        self
    }

    /// The per-instance reducer. Present means the binding is scoped:
    /// instances own a slice, mount lifecycle actions fire and
    /// dispatch is wrapped.
    pub fn reducer(
        mut self,
        reducer: impl Fn(Option<&Value>, &Action) -> Value + 'static,
    ) -> Self {
        self.reducer = Some(Rc::new(reducer));
        self
    }

    /// Add one getter to the composed selection:
    /// `(instance_slice, global_state, props)`.
    pub fn getter(
        mut self,
        getter: impl Fn(Option<&Value>, &Value, &Value) -> Value + 'static,
    ) -> Self {
        self.getters.push(Rc::new(getter));
        self
    }

    /// Combine the getter outputs into the derived props.
    pub fn combine(mut self, combine: impl Fn(&[Value]) -> Value + 'static) -> Self {
        self.combine = Some(Rc::new(combine));
        self
    }

    /// Supply a ready-made selector per instance instead of a composed
    /// one. Mutually exclusive with getters/combine.
    pub fn pick_with(mut self, factory: impl Fn() -> PickedSelector + 'static) -> Self {
        self.pick = Some(Rc::new(factory));
        self
    }

    pub fn denormalize(mut self, rules: Denormalize) -> Self {
        self.denormalize = Some(rules);
        self
    }

    /// Add one named action-creator trigger. Replaces a previously set
    /// factory map.
    pub fn dispatch_prop<D: Into<Dispatchable>>(
        mut self,
        name: impl Into<String>,
        creator: impl Fn(Value) -> D + 'static,
    ) -> Self {
        let creator: ActionCreator = Rc::new(move |args| creator(args).into());
        match &mut self.dispatch_map {
            Some(DispatchMap::Creators(map)) => {
                map.insert(name.into(), creator);
            }
            _ => {
                let mut map = IndexMap::new();
                map.insert(name.into(), creator);
                self.dispatch_map = Some(DispatchMap::Creators(map));
            }
        }
        self
    }

    /// Derive the triggers from the wrapped dispatch handle and the
    /// incoming props. Replaces any creator triggers.
    pub fn dispatch_props_with(
        mut self,
        factory: impl Fn(&Dispatch, &Value) -> ActionTriggers + 'static,
    ) -> Self {
        self.dispatch_map = Some(DispatchMap::Factory(Rc::new(factory)));
        self
    }

    /// Whether the instance id is injected into the derived props
    /// under `"selfID"`. On by default.
    pub fn attach_self_id(mut self, enabled: bool) -> Self {
        self.attach_self_id = enabled;
        self
    }
}

impl fmt::Debug for BindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindSpec")
            .field("display_name", &self.display_name)
            .field("self_id", &self.self_id)
            .field("scoped", &self.reducer.is_some())
            .field("getters", &self.getters.len())
            .field("attach_self_id", &self.attach_self_id)
            .finish_non_exhaustive()
    }
}

// ── Selection resolution ────────────────────────────────────────────

/// The validated selection policy, shared by global and local
/// bindings.
pub(crate) enum Selection {
    Composed {
        getters: Vec<Getter>,
        combine: Combiner,
    },
    Picked(PickFactory),
}

impl Selection {
    /// Materialize a fresh per-instance selector. Instances never
    /// share a memo cache.
    pub(crate) fn instantiate(&self) -> InstanceSelector {
        match self {
            Self::Composed { getters, combine } => {
                InstanceSelector::Memo(MemoSelector::new(getters.clone(), Rc::clone(combine)))
            }
            Self::Picked(factory) => InstanceSelector::Picked(RefCell::new((**factory)())),
        }
    }
}

pub(crate) fn resolve_selection(
    pick: Option<PickFactory>,
    getters: Vec<Getter>,
    combine: Option<Combiner>,
    has_reducer: bool,
) -> Result<Selection, BindError> {
    if pick.is_some() && (!getters.is_empty() || combine.is_some()) {
        return Err(BindError::ConflictingSelection);
    }
    if let Some(factory) = pick {
        return Ok(Selection::Picked(factory));
    }
    if let Some(combine) = combine {
        return Ok(Selection::Composed { getters, combine });
    }
    if !getters.is_empty() {
        // Getters with no combiner is an incomplete selection.
        return Err(BindError::MissingSelector);
    }
    if has_reducer {
        // Identity default: the derived props are the instance slice.
        return Ok(Selection::Composed {
            getters: vec![Rc::new(|slice: Option<&Value>, _: &Value, _: &Value| {
                slice.cloned().unwrap_or(Value::Null)
            })],
            combine: Rc::new(|inputs: &[Value]| {
                inputs.first().cloned().unwrap_or(Value::Null)
            }),
        });
    }
    Err(BindError::MissingSelector)
}

// ── Binding ─────────────────────────────────────────────────────────

/// Validated connection for one component type. Cheap to keep around;
/// attach once per mounted component.
pub struct Binding {
    pub(crate) engine: Rc<Engine>,
    pub(crate) reducer: Option<InstanceReducer>,
    pub(crate) selection: Selection,
    pub(crate) denormalize: Option<Denormalize>,
    pub(crate) dispatch_map: Option<DispatchMap>,
    pub(crate) attach_self_id: bool,
    display_name: String,
    id_prefix: String,
    fixed_id: Option<SelfId>,
    base_ordinal: u64,
    next_instance: Cell<u64>,
}

/// Validate a [`BindSpec`] against an engine.
pub fn bind(engine: &Rc<Engine>, spec: BindSpec) -> Result<Binding, BindError> {
    validate_component_name("display name", &spec.display_name)?;
    let selection = resolve_selection(
        spec.pick,
        spec.getters,
        spec.combine,
        spec.reducer.is_some(),
    )?;

    // Auto-generated ids are always three-part. Without type naming
    // the prefix is synthesized from its own engine ordinal.
    let id_prefix = if engine.names_by_component_type() {
        spec.display_name.clone()
    } else {
        format!("C{}", engine.next_ordinal())
    };

    Ok(Binding {
        engine: Rc::clone(engine),
        reducer: spec.reducer,
        selection,
        denormalize: spec.denormalize,
        dispatch_map: spec.dispatch_map,
        attach_self_id: spec.attach_self_id,
        display_name: spec.display_name,
        id_prefix,
        fixed_id: spec.self_id,
        base_ordinal: engine.next_ordinal(),
        next_instance: Cell::new(0),
    })
}

impl Binding {
    /// Whether instances own a state slice (a reducer is present).
    pub fn is_scoped(&self) -> bool {
        self.reducer.is_some()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Mount one instance against `store` with the given props.
    pub fn attach(&self, store: &Rc<Store>, props: &Value) -> Result<Instance, BindError> {
        Instance::mount(self, store, props)
    }

    /// Identity resolution order: explicit `"selfID"` prop, then the
    /// binding's fixed id, then a fresh auto-generated id.
    pub(crate) fn resolve_id(&self, props: &Value) -> SelfId {
        if let Some(id) = props.get(SELF_ID_PROP).and_then(Value::as_str) {
            return SelfId::from(id);
        }
        if let Some(id) = &self.fixed_id {
            return id.clone();
        }
        self.next_auto_id()
    }

    fn next_auto_id(&self) -> SelfId {
        let n = self.next_instance.get() + 1;
        self.next_instance.set(n);
        SelfId::new(format!("{}:{}:{n}", self.id_prefix, self.base_ordinal))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("display_name", &self.display_name)
            .field("scoped", &self.is_scoped())
            .field("fixed_id", &self.fixed_id)
            .field("base_ordinal", &self.base_ordinal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use selfslice_core::EngineConfig;
    use serde_json::json;

    fn counter(state: Option<&Value>, action: &Action) -> Value {
        let n = state.and_then(Value::as_i64).unwrap_or(0);
        if action.kind.ends_with("/INC") {
            json!(n + 1)
        } else {
            json!(n)
        }
    }

    #[test]
    fn invalid_display_name_is_rejected() {
        let engine = Engine::with_defaults();
        let err = bind(&engine, BindSpec::new("not a name").reducer(counter)).unwrap_err();
        assert!(matches!(err, BindError::Config(_)));
    }

    #[test]
    fn pick_conflicts_with_getters() {
        let engine = Engine::with_defaults();
        let spec = BindSpec::new("Comp")
            .getter(|_, _, _| Value::Null)
            .combine(|_| Value::Null)
            .pick_with(|| Box::new(|_, _, _| Rc::new(Value::Null)));
        assert_eq!(
            bind(&engine, spec).unwrap_err(),
            BindError::ConflictingSelection
        );
    }

    #[test]
    fn getters_without_a_combiner_are_incomplete() {
        let engine = Engine::with_defaults();
        let spec = BindSpec::new("Comp")
            .reducer(counter)
            .getter(|_, _, _| Value::Null);
        assert_eq!(bind(&engine, spec).unwrap_err(), BindError::MissingSelector);
    }

    #[test]
    fn stateless_binding_without_selector_is_rejected() {
        let engine = Engine::with_defaults();
        assert_eq!(
            bind(&engine, BindSpec::new("Comp")).unwrap_err(),
            BindError::MissingSelector
        );
    }

    #[test]
    fn a_reducer_alone_gets_the_identity_selection() {
        let engine = Engine::with_defaults();
        let binding = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();
        assert!(binding.is_scoped());

        let selector = binding.selection.instantiate();
        let slice = json!({ "count": 3 });
        let out = selector.select(Some(&slice), &json!({}), &json!({}));
        assert_eq!(*out, slice);
    }

    #[test]
    fn resolve_id_prefers_the_props_then_the_fixed_id() {
        let engine = Engine::with_defaults();
        let binding = bind(
            &engine,
            BindSpec::new("Comp").reducer(counter).self_id("pinned"),
        )
        .unwrap();

        assert_eq!(
            binding.resolve_id(&json!({ "selfID": "explicit" })),
            SelfId::from("explicit")
        );
        assert_eq!(binding.resolve_id(&json!({})), SelfId::from("pinned"));
    }

    #[test]
    fn auto_ids_count_per_binding_and_per_engine() {
        let engine = Engine::new(EngineConfig::new().name_instances_by_component_type(true))
            .unwrap();

        let first = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();
        assert_eq!(first.resolve_id(&json!({})), SelfId::from("Comp:1:1"));
        assert_eq!(first.resolve_id(&json!({})), SelfId::from("Comp:1:2"));

        let second = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();
        assert_eq!(second.resolve_id(&json!({})), SelfId::from("Comp:2:1"));
    }

    #[test]
    fn auto_ids_without_type_naming_use_a_synthetic_prefix() {
        let engine = Engine::with_defaults();
        let first = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();
        assert_eq!(first.resolve_id(&json!({})), SelfId::from("C1:2:1"));
        assert_eq!(first.resolve_id(&json!({})), SelfId::from("C1:2:2"));

        // The display name never leaks into the id; the prefix and
        // base come from the engine's ordinal source.
        let second = bind(&engine, BindSpec::new("Comp").reducer(counter)).unwrap();
        assert_eq!(second.resolve_id(&json!({})), SelfId::from("C3:4:1"));
    }
}
