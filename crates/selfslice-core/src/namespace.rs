// ── Naming configuration ──
//
// The slice name decides everything else: the action-type prefix and
// the two lifecycle action types are derived from it. A Namespace is a
// plain value -- engines own one and closures clone it, so there is no
// hidden process-wide naming state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::{Action, ActionMeta};
use crate::error::ConfigError;
use crate::ident::SelfId;

/// Names for one binding namespace: the slice key in the global tree,
/// the action prefix `@@{slice}:` and the mount/unmount action types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    slice_name: String,
    prefix: String,
    mount: String,
    unmount: String,
}

impl Namespace {
    /// Build a namespace from a slice name. The name must be a plain
    /// identifier (`[A-Za-z][A-Za-z0-9$_]*`).
    pub fn new(slice_name: impl Into<String>) -> Result<Self, ConfigError> {
        let slice_name = slice_name.into();
        validate_component_name("slice name", &slice_name)?;

        let prefix = format!("@@{slice_name}:");
        let mount = format!("{prefix}COMPONENT_MOUNTING");
        let unmount = format!("{prefix}COMPONENT_UNMOUNTING");

        Ok(Self {
            slice_name,
            prefix,
            mount,
            unmount,
        })
    }

    /// Key under which all instance slices live in the global tree.
    pub fn slice_name(&self) -> &str {
        &self.slice_name
    }

    /// Prefix identifying actions that belong to this namespace.
    pub fn action_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn mount_type(&self) -> &str {
        &self.mount
    }

    pub fn unmount_type(&self) -> &str {
        &self.unmount
    }

    /// Whether the action belongs to this namespace (prefix check).
    pub fn owns(&self, action: &Action) -> bool {
        action.kind.starts_with(&self.prefix)
    }

    /// Build a namespaced action type `@@{slice}:{component}/{action}`,
    /// validating both name parts.
    pub fn action_type(&self, component: &str, action: &str) -> Result<String, ConfigError> {
        validate_component_name("component name", component)?;
        validate_action_name("action name", action)?;
        Ok(format!("{}{component}/{action}", self.prefix))
    }

    /// The lifecycle action that creates an instance slice. The first
    /// routed action a freshly registered reducer sees is this one.
    pub fn mount_action(&self, id: &SelfId) -> Action {
        self.lifecycle_action(self.mount.clone(), id)
    }

    /// The lifecycle action that removes an instance slice.
    pub fn unmount_action(&self, id: &SelfId) -> Action {
        self.lifecycle_action(self.unmount.clone(), id)
    }

    fn lifecycle_action(&self, kind: String, id: &SelfId) -> Action {
        Action {
            kind,
            meta: Some(ActionMeta {
                self_id: Some(id.clone()),
                extra: Map::new(),
            }),
            payload: Value::Object(Map::new()),
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            slice_name: "self".into(),
            prefix: "@@self:".into(),
            mount: "@@self:COMPONENT_MOUNTING".into(),
            unmount: "@@self:COMPONENT_UNMOUNTING".into(),
        }
    }
}

// ── Name validation ─────────────────────────────────────────────────

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '$' || c == '_'
}

/// Component-style names start with a letter: `[A-Za-z][A-Za-z0-9$_]*`.
pub fn validate_component_name(what: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid = matches!(chars.next(), Some(c) if is_ident_start(c)) && chars.all(is_ident_char);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            what,
            value: value.to_owned(),
        })
    }
}

/// Action names are non-empty `[A-Za-z0-9$_]+`.
pub fn validate_action_name(what: &'static str, value: &str) -> Result<(), ConfigError> {
    if !value.is_empty() && value.chars().all(is_ident_char) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            what,
            value: value.to_owned(),
        })
    }
}
