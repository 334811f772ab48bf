// ── Entity denormalization contract ──
//
// Selected slices may hold normalized references into a shared entity
// database reachable from global state. The getter locating that
// database and the function resolving references are both engine
// configuration; the defaults below cover the common layout
// `state.entities[collection][id]`.

use std::rc::Rc;

use serde_json::Value;

/// Locates the entity database inside the global state tree.
pub type EntitiesGetter = Rc<dyn Fn(&Value) -> Value>;

/// Resolves one normalized value against a schema and the entity db.
pub type DenormalizeFn = Rc<dyn Fn(&Value, &Schema, &Value) -> Value>;

/// Shape of a normalized reference.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Schema {
    /// A single id referencing `db[collection][id]`.
    Entity(String),
    /// An array of references, resolved element-wise.
    List(Box<Schema>),
}

impl Schema {
    pub fn entity(collection: impl Into<String>) -> Self {
        Self::Entity(collection.into())
    }

    pub fn list(inner: Schema) -> Self {
        Self::List(Box::new(inner))
    }
}

/// Default denormalize function.
///
/// Ids may be strings or integers (integers are keyed by their decimal
/// form). Anything unresolvable -- a missing collection, an unknown
/// id, a non-id value -- denormalizes to null rather than erroring.
pub fn denormalize(value: &Value, schema: &Schema, db: &Value) -> Value {
    match schema {
        Schema::Entity(collection) => {
            let Some(key) = id_key(value) else {
                return Value::Null;
            };
            db.get(collection.as_str())
                .and_then(|table| table.get(key.as_str()))
                .cloned()
                .unwrap_or(Value::Null)
        }
        Schema::List(inner) => match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| denormalize(item, inner, db))
                    .collect(),
            ),
            _ => Value::Null,
        },
    }
}

fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
