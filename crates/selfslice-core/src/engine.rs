// ── Engine root ──
//
// One Engine owns the namespace, the instance registry, the ordinal
// source and the denormalization configuration. Bindings and lifecycle
// wrappers receive it by Rc handle -- there are no module-level
// singletons, and tests tear the whole subsystem down by dropping it.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::entities::{self, DenormalizeFn, EntitiesGetter, Schema};
use crate::error::ConfigError;
use crate::ident::{IdGenerator, SelfId};
use crate::namespace::Namespace;
use crate::reducer::SliceReducer;
use crate::registry::Registry;

/// Process-startup configuration surface. Last write wins per key;
/// intended to be applied once, before any binding is constructed.
pub struct EngineConfig {
    slice_name: String,
    entities_getter: Option<EntitiesGetter>,
    denormalize_fn: Option<DenormalizeFn>,
    name_instances_by_component_type: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            slice_name: "self".into(),
            entities_getter: None,
            denormalize_fn: None,
            name_instances_by_component_type: false,
        }
    }

    /// Key under which all instance slices live in the global tree.
    /// Also derives the action prefix and lifecycle action types.
    pub fn slice_name(mut self, name: impl Into<String>) -> Self {
        self.slice_name = name.into();
        self
    }

    /// Where to find the entity database in global state.
    /// Default: `state["entities"]`.
    pub fn entities_getter(mut self, getter: impl Fn(&Value) -> Value + 'static) -> Self {
        self.entities_getter = Some(Rc::new(getter));
        self
    }

    /// The denormalization library hook. Default: [`entities::denormalize`].
    pub fn denormalize_fn(
        mut self,
        f: impl Fn(&Value, &Schema, &Value) -> Value + 'static,
    ) -> Self {
        self.denormalize_fn = Some(Rc::new(f));
        self
    }

    /// When enabled, auto-generated instance ids are prefixed with the
    /// binding's display name instead of a purely numeric ordinal.
    pub fn name_instances_by_component_type(mut self, enabled: bool) -> Self {
        self.name_instances_by_component_type = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("slice_name", &self.slice_name)
            .field(
                "name_instances_by_component_type",
                &self.name_instances_by_component_type,
            )
            .finish_non_exhaustive()
    }
}

/// Root of the binding subsystem.
pub struct Engine {
    namespace: Namespace,
    registry: Registry,
    ids: IdGenerator,
    entities_getter: EntitiesGetter,
    denormalize_fn: DenormalizeFn,
    name_by_type: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Rc<Self>, ConfigError> {
        let namespace = Namespace::new(config.slice_name)?;
        Ok(Rc::new(Self {
            namespace,
            registry: Registry::new(),
            ids: IdGenerator::default(),
            entities_getter: config
                .entities_getter
                .unwrap_or_else(|| Rc::new(default_entities_getter)),
            denormalize_fn: config
                .denormalize_fn
                .unwrap_or_else(|| Rc::new(entities::denormalize)),
            name_by_type: config.name_instances_by_component_type,
        }))
    }

    /// An engine with the default configuration (slice name `self`).
    pub fn with_defaults() -> Rc<Self> {
        Rc::new(Self {
            namespace: Namespace::default(),
            registry: Registry::new(),
            ids: IdGenerator::default(),
            entities_getter: Rc::new(default_entities_getter),
            denormalize_fn: Rc::new(entities::denormalize),
            name_by_type: false,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The reducer the host must mount at `state[slice_name]`.
    pub fn slice_reducer(self: &Rc<Self>) -> SliceReducer {
        SliceReducer::new(Rc::clone(self))
    }

    /// Next engine-wide ordinal; monotonic, never reused.
    pub fn next_ordinal(&self) -> u64 {
        self.ids.next_ordinal()
    }

    pub fn names_by_component_type(&self) -> bool {
        self.name_by_type
    }

    /// The entity database for denormalization.
    pub fn entities(&self, state: &Value) -> Value {
        (*self.entities_getter)(state)
    }

    pub fn denormalize(&self, value: &Value, schema: &Schema, db: &Value) -> Value {
        (*self.denormalize_fn)(value, schema, db)
    }

    pub fn denormalize_fn(&self) -> DenormalizeFn {
        Rc::clone(&self.denormalize_fn)
    }

    /// The whole slice subtree, if the host mounted it.
    pub fn slice_of<'a>(&self, state: &'a Value) -> Option<&'a Value> {
        state.get(self.namespace.slice_name())
    }

    /// One instance's slice: `state[slice_name][id]`.
    pub fn instance_slice<'a>(&self, state: &'a Value, id: &SelfId) -> Option<&'a Value> {
        self.slice_of(state)?.get(id.as_str())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("namespace", &self.namespace)
            .field("registry", &self.registry)
            .field("name_by_type", &self.name_by_type)
            .finish_non_exhaustive()
    }
}

fn default_entities_getter(state: &Value) -> Value {
    state.get("entities").cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn defaults_mirror_the_classic_layout() {
        let engine = Engine::with_defaults();
        assert_eq!(engine.namespace().slice_name(), "self");
        assert!(!engine.names_by_component_type());

        let state = json!({ "entities": { "users": {} }, "self": {} });
        assert_eq!(engine.entities(&state), json!({ "users": {} }));
        assert_eq!(engine.entities(&json!({})), Value::Null);
    }

    #[test]
    fn configured_slice_name_flows_into_the_namespace() {
        let engine = Engine::new(EngineConfig::new().slice_name("widgets")).unwrap();
        assert_eq!(engine.namespace().action_prefix(), "@@widgets:");
    }

    #[test]
    fn invalid_slice_name_is_a_config_error() {
        assert!(Engine::new(EngineConfig::new().slice_name("not ok")).is_err());
    }

    #[test]
    fn custom_entities_getter_and_denormalize_fn() {
        let engine = Engine::new(
            EngineConfig::new()
                .entities_getter(|state| state.get("db").cloned().unwrap_or(Value::Null))
                .denormalize_fn(|value, _, _| json!({ "resolved": value })),
        )
        .unwrap();

        let state = json!({ "db": { "things": {} } });
        assert_eq!(engine.entities(&state), json!({ "things": {} }));
        assert_eq!(
            engine.denormalize(&json!("x"), &Schema::entity("things"), &Value::Null),
            json!({ "resolved": "x" })
        );
    }

    #[test]
    fn instance_slice_navigates_the_tree() {
        let engine = Engine::with_defaults();
        let state = json!({ "self": { "A": { "count": 2 } } });
        assert_eq!(
            engine.instance_slice(&state, &SelfId::from("A")),
            Some(&json!({ "count": 2 }))
        );
        assert_eq!(engine.instance_slice(&state, &SelfId::from("B")), None);
        assert_eq!(engine.instance_slice(&json!({}), &SelfId::from("A")), None);
    }
}
