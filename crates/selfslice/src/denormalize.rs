// ── Denormalization rules ──
//
// Optional post-processing of selected props: resolve normalized
// entity references against the shared entity database. The wrapper
// keeps the selector's referential-stability contract by memoizing on
// the base result handle and the entity db value.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use selfslice_core::{DenormalizeFn, Engine, Schema};

/// Custom denormalization hook: `(selected, entity_db, denormalize_fn)`.
pub type CustomDenormalize = Rc<dyn Fn(&Value, &Value, &DenormalizeFn) -> Value>;

/// How to resolve entity references in the selected result.
#[derive(Clone)]
pub enum Denormalize {
    /// Per-key schemas, applied against the selected result object.
    /// Keys whose selected value is null pass through as null.
    Map(IndexMap<String, Schema>),
    /// A free-form function over the whole selected result.
    Custom(CustomDenormalize),
}

impl Denormalize {
    pub fn schema_map<I, K>(rules: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Map(
            rules
                .into_iter()
                .map(|(key, schema)| (key.into(), schema))
                .collect(),
        )
    }

    pub fn custom(f: impl Fn(&Value, &Value, &DenormalizeFn) -> Value + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }
}

/// Per-instance memo around a [`Denormalize`] rule set.
pub(crate) struct DenormMemo {
    rules: Denormalize,
    cache: RefCell<Option<(Rc<Value>, Value, Rc<Value>)>>,
}

impl DenormMemo {
    pub(crate) fn new(rules: Denormalize) -> Self {
        Self {
            rules,
            cache: RefCell::new(None),
        }
    }

    pub(crate) fn apply(&self, engine: &Engine, base: Rc<Value>, db: Value) -> Rc<Value> {
        {
            let cache = self.cache.borrow();
            if let Some((cached_base, cached_db, cached_out)) = cache.as_ref() {
                if Rc::ptr_eq(cached_base, &base) && *cached_db == db {
                    return Rc::clone(cached_out);
                }
            }
        }

        let out = Rc::new(self.resolve(engine, &base, &db));
        *self.cache.borrow_mut() = Some((base, db, Rc::clone(&out)));
        out
    }

    fn resolve(&self, engine: &Engine, base: &Value, db: &Value) -> Value {
        match &self.rules {
            Denormalize::Custom(f) => (**f)(base, db, &engine.denormalize_fn()),
            Denormalize::Map(rules) => {
                let Value::Object(selected) = base else {
                    // Nothing keyed to resolve against.
                    return base.clone();
                };
                let mut result = selected.clone();
                for (key, schema) in rules {
                    let current = result.get(key.as_str()).cloned().unwrap_or(Value::Null);
                    let resolved = if current.is_null() {
                        Value::Null
                    } else {
                        engine.denormalize(&current, schema, db)
                    };
                    result.insert(key.clone(), resolved);
                }
                Value::Object(result)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn db() -> Value {
        json!({ "users": { "u1": { "name": "ada" } } })
    }

    #[test]
    fn map_rules_resolve_per_key_and_keep_null() {
        let engine = Engine::with_defaults();
        let memo = DenormMemo::new(Denormalize::schema_map([("owner", Schema::entity("users"))]));

        let base = Rc::new(json!({ "owner": "u1", "title": "t" }));
        let out = memo.apply(&engine, base, db());
        assert_eq!(*out, json!({ "owner": { "name": "ada" }, "title": "t" }));

        let base = Rc::new(json!({ "owner": null, "title": "t" }));
        let out = memo.apply(&engine, base, db());
        assert_eq!(*out, json!({ "owner": null, "title": "t" }));
    }

    #[test]
    fn unchanged_base_and_db_return_a_reference_equal_result() {
        let engine = Engine::with_defaults();
        let memo = DenormMemo::new(Denormalize::schema_map([("owner", Schema::entity("users"))]));

        let base = Rc::new(json!({ "owner": "u1" }));
        let first = memo.apply(&engine, Rc::clone(&base), db());
        let second = memo.apply(&engine, base, db());
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn db_change_recomputes() {
        let engine = Engine::with_defaults();
        let memo = DenormMemo::new(Denormalize::schema_map([("owner", Schema::entity("users"))]));

        let base = Rc::new(json!({ "owner": "u1" }));
        let first = memo.apply(&engine, Rc::clone(&base), db());
        let second = memo.apply(
            &engine,
            base,
            json!({ "users": { "u1": { "name": "grace" } } }),
        );
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(*second, json!({ "owner": { "name": "grace" } }));
    }

    #[test]
    fn custom_rule_sees_the_whole_result_and_the_hook() {
        let engine = Engine::with_defaults();
        let memo = DenormMemo::new(Denormalize::custom(|selected, db, denorm| {
            let resolved = (**denorm)(
                selected.get("owner").unwrap_or(&Value::Null),
                &Schema::entity("users"),
                db,
            );
            json!({ "resolved": resolved })
        }));

        let out = memo.apply(&engine, Rc::new(json!({ "owner": "u1" })), db());
        assert_eq!(*out, json!({ "resolved": { "name": "ada" } }));
    }
}
