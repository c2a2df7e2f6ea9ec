use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Functional area of the application.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
    ToSchema, Display, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Module {
    Dashboard,
    Branches,
    Employees,
    Leaves,
    Documents,
    Settings,
    Users,
}

impl Module {
    /// The landing module every visitor may see, signed in or not.
    pub const ALWAYS_VISIBLE: Module = Module::Dashboard;
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
    ToSchema, Display, AsRefStr, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

/// Capability table: module -> allowed actions.
///
/// Serialized as `{"branches": ["view"], ...}`. Deserialization is lenient:
/// unknown modules, unknown actions and wrongly shaped entries are dropped,
/// so a damaged map can only ever grant less.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionMap(BTreeMap<Module, BTreeSet<Action>>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action on every module.
    pub fn full() -> Self {
        let mut map = Self::new();
        for module in Module::iter() {
            for action in Action::iter() {
                map.grant(module, action);
            }
        }
        map
    }

    /// Default capabilities for a user record that carries no explicit map.
    pub fn defaults_for(role: Role) -> Self {
        match role {
            Role::Admin => Self::full(),
            Role::User => {
                let mut map = Self::new();
                map.grant(Module::Branches, Action::View);
                map.grant(Module::Employees, Action::View);
                map
            }
        }
    }

    pub fn grant(&mut self, module: Module, action: Action) -> &mut Self {
        self.0.entry(module).or_default().insert(action);
        self
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.0
            .get(&module)
            .is_some_and(|actions| actions.contains(&action))
    }

    /// Builds a map from loosely typed JSON, keeping only well-formed grants.
    pub fn from_value(value: &Value) -> Self {
        let mut map = Self::new();
        let Some(entries) = value.as_object() else {
            return map;
        };

        for (name, actions) in entries {
            let Ok(module) = name.parse::<Module>() else {
                continue;
            };
            let Some(actions) = actions.as_array() else {
                continue;
            };
            for action in actions.iter().filter_map(Value::as_str) {
                if let Ok(action) = action.parse::<Action>() {
                    map.grant(module, action);
                }
            }
        }

        map
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<'de> Deserialize<'de> for PermissionMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl FromIterator<(Module, Action)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (Module, Action)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (module, action) in iter {
            map.grant(module, action);
        }
        map
    }
}
