// ── Selector composition ──
//
// A selector derives a component's props from its instance slice, the
// global state and the incoming props. Composed selectors memoize on
// their getter outputs and hand back an `Rc` result, so unchanged
// inputs yield a reference-equal result and downstream equality checks
// stay cheap.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

/// Extracts one piece of state: `(instance_slice, global_state, props)`.
/// The slice is `None` for stateless bindings.
pub type Getter = Rc<dyn Fn(Option<&Value>, &Value, &Value) -> Value>;

/// Combines getter outputs into the derived props.
pub type Combiner = Rc<dyn Fn(&[Value]) -> Value>;

/// A ready-made selector produced by a pick factory. Stateful (owns
/// its memo), hence `FnMut`.
pub type PickedSelector = Box<dyn FnMut(Option<&Value>, &Value, &Value) -> Rc<Value>>;

/// Factory producing one [`PickedSelector`] per attached instance, so
/// instances never share a memo cache.
pub type PickFactory = Rc<dyn Fn() -> PickedSelector>;

/// Memoizing selector over a getter pipeline.
///
/// Recomputes only when some getter output differs from the cached
/// inputs; otherwise returns the cached result handle unchanged.
pub struct MemoSelector {
    getters: Vec<Getter>,
    combine: Combiner,
    cache: RefCell<Option<(Vec<Value>, Rc<Value>)>>,
}

impl MemoSelector {
    pub fn new(getters: Vec<Getter>, combine: Combiner) -> Self {
        Self {
            getters,
            combine,
            cache: RefCell::new(None),
        }
    }

    pub fn select(&self, slice: Option<&Value>, state: &Value, props: &Value) -> Rc<Value> {
        let inputs: Vec<Value> = self
            .getters
            .iter()
            .map(|getter| (**getter)(slice, state, props))
            .collect();

        {
            let cache = self.cache.borrow();
            if let Some((cached_inputs, cached_result)) = cache.as_ref() {
                if *cached_inputs == inputs {
                    return Rc::clone(cached_result);
                }
            }
        }

        let result = Rc::new((*self.combine)(&inputs));
        *self.cache.borrow_mut() = Some((inputs, Rc::clone(&result)));
        result
    }
}

/// Per-instance selector, resolved from the binding's selection spec.
pub(crate) enum InstanceSelector {
    Memo(MemoSelector),
    Picked(RefCell<PickedSelector>),
}

impl InstanceSelector {
    pub(crate) fn select(&self, slice: Option<&Value>, state: &Value, props: &Value) -> Rc<Value> {
        match self {
            Self::Memo(memo) => memo.select(slice, state, props),
            Self::Picked(picked) => {
                let mut selector = picked.borrow_mut();
                (*selector)(slice, state, props)
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
    use std::cell::Cell;

    fn slice_getter() -> Getter {
        Rc::new(|slice: Option<&Value>, _: &Value, _: &Value| {
            slice.cloned().unwrap_or(Value::Null)
        })
    }

    fn props_getter(key: &'static str) -> Getter {
        Rc::new(move |_: Option<&Value>, _: &Value, props: &Value| {
            props.get(key).cloned().unwrap_or(Value::Null)
        })
    }

    #[test]
    fn unchanged_inputs_return_a_reference_equal_result() {
        let selector = MemoSelector::new(
            vec![slice_getter(), props_getter("name")],
            Rc::new(|inputs: &[Value]| json!({ "slice": inputs[0], "name": inputs[1] })),
        );

        let slice = json!({ "count": 1 });
        let state = json!({});
        let props = json!({ "name": "a" });

        let first = selector.select(Some(&slice), &state, &props);
        let second = selector.select(Some(&slice), &state, &props);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*first, json!({ "slice": { "count": 1 }, "name": "a" }));
    }

    #[test]
    fn changed_getter_output_triggers_recompute() {
        let calls = Rc::new(Cell::new(0u32));
        let calls_in_combine = Rc::clone(&calls);

        let selector = MemoSelector::new(
            vec![slice_getter()],
            Rc::new(move |inputs: &[Value]| {
                calls_in_combine.set(calls_in_combine.get() + 1);
                inputs[0].clone()
            }),
        );

        let state = json!({});
        let props = json!({});

        let first = selector.select(Some(&json!(1)), &state, &props);
        let second = selector.select(Some(&json!(2)), &state, &props);
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 2);

        // Back to an equal input: recomputes (only the latest inputs
        // are cached) but the contract is about unchanged inputs.
        selector.select(Some(&json!(2)), &state, &props);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn irrelevant_state_changes_do_not_recompute() {
        let calls = Rc::new(Cell::new(0u32));
        let calls_in_combine = Rc::clone(&calls);

        let selector = MemoSelector::new(
            vec![slice_getter()],
            Rc::new(move |inputs: &[Value]| {
                calls_in_combine.set(calls_in_combine.get() + 1);
                inputs[0].clone()
            }),
        );

        let slice = json!({ "count": 1 });
        let first = selector.select(Some(&slice), &json!({ "noise": 1 }), &json!({}));
        let second = selector.select(Some(&slice), &json!({ "noise": 2 }), &json!({}));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_getters_compute_once_and_stay_stable() {
        let selector = MemoSelector::new(vec![], Rc::new(|_: &[Value]| json!({ "static": true })));
        let first = selector.select(None, &json!({}), &json!({}));
        let second = selector.select(None, &json!({ "other": 1 }), &json!({}));
        assert!(Rc::ptr_eq(&first, &second));
    }
}
