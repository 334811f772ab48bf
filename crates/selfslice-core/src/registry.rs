// ── Instance registry ──
//
// Mutable mapping from instance id to that instance's reducer. All
// mutation happens on the single dispatch/render thread, so interior
// mutability is a `RefCell`, not a lock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::action::Action;
use crate::error::DuplicateIdentityError;
use crate::ident::SelfId;

/// Reducer owned by one mounted instance.
///
/// Called with `None` for a slice that does not exist yet; the mount
/// action is the first routed action and must initialize the slice.
pub type InstanceReducer = Rc<dyn Fn(Option<&Value>, &Action) -> Value>;

/// Registry of live instances: at most one entry per id at any time.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<HashMap<SelfId, InstanceReducer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the reducer under `id`. Fails before any mutation if the
    /// id is already held -- two live instances sharing an identity is
    /// a caller bug.
    pub fn register(
        &self,
        id: SelfId,
        reducer: InstanceReducer,
    ) -> Result<(), DuplicateIdentityError> {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&id) {
            return Err(DuplicateIdentityError { id });
        }
        entries.insert(id, reducer);
        Ok(())
    }

    /// Remove the entry for `id`. Unregistering an absent id is a no-op;
    /// returns whether an entry was removed.
    pub fn unregister(&self, id: &SelfId) -> bool {
        self.entries.borrow_mut().remove(id).is_some()
    }

    pub fn has(&self, id: &SelfId) -> bool {
        self.entries.borrow().contains_key(id)
    }

    pub fn get(&self, id: &SelfId) -> Option<InstanceReducer> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn reducer(marker: i64) -> InstanceReducer {
        Rc::new(move |_, _| json!(marker))
    }

    #[test]
    fn register_then_lookup() {
        let registry = Registry::new();
        registry.register(SelfId::from("A"), reducer(1)).unwrap();

        assert!(registry.has(&SelfId::from("A")));
        assert_eq!(registry.len(), 1);

        let found = registry.get(&SelfId::from("A")).unwrap();
        assert_eq!((*found)(None, &Action::new("X")), json!(1));
    }

    #[test]
    fn duplicate_registration_fails_before_mutating() {
        let registry = Registry::new();
        registry.register(SelfId::from("A"), reducer(1)).unwrap();

        let err = registry
            .register(SelfId::from("A"), reducer(2))
            .unwrap_err();
        assert_eq!(err.id, SelfId::from("A"));

        // The original entry survives untouched.
        let found = registry.get(&SelfId::from("A")).unwrap();
        assert_eq!((*found)(None, &Action::new("X")), json!(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_absent_id_is_a_noop() {
        let registry = Registry::new();
        assert!(!registry.unregister(&SelfId::from("ghost")));
        assert!(registry.is_empty());
    }

    #[test]
    fn id_is_reusable_after_unregister() {
        let registry = Registry::new();
        registry.register(SelfId::from("A"), reducer(1)).unwrap();
        assert!(registry.unregister(&SelfId::from("A")));
        assert!(!registry.has(&SelfId::from("A")));

        registry.register(SelfId::from("A"), reducer(2)).unwrap();
        let found = registry.get(&SelfId::from("A")).unwrap();
        assert_eq!((*found)(None, &Action::new("X")), json!(2));
    }
}
