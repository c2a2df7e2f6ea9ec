//! Visibility and action checks.
//!
//! Decisions are pure lookups over the session's resolved capability table.
//! Rules, first match wins:
//!
//! 1. the dashboard is visible to everyone,
//! 2. no session denies,
//! 3. admins are allowed everything,
//! 4. otherwise the module's action set in the permission map decides, a
//!    missing module being an empty set.

use serde::Serialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::{
    auth::session::Session,
    model::{
        permission::{Action, Module, PermissionMap},
        role::Role,
    },
};

pub fn can(session: Option<&Session>, module: Module, action: Action) -> bool {
    if module == Module::ALWAYS_VISIBLE {
        return true;
    }
    let Some(session) = session else {
        return false;
    };
    if session.is_admin() {
        return true;
    }
    session.permissions.allows(module, action)
}

/// Same as [`can`] for raw names; unknown names deny.
pub fn can_named(session: Option<&Session>, module: &str, action: &str) -> bool {
    match (module.parse::<Module>(), action.parse::<Action>()) {
        (Ok(module), Ok(action)) => can(session, module, action),
        // the landing module stays visible whatever action is asked for
        (Ok(module), Err(_)) => module == Module::ALWAYS_VISIBLE,
        _ => false,
    }
}

/// Explicit map when present, role defaults otherwise.
pub fn resolve_permissions(role: Role, explicit: Option<PermissionMap>) -> PermissionMap {
    explicit.unwrap_or_else(|| PermissionMap::defaults_for(role))
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ModuleAccess {
    pub module: Module,
    pub actions: Vec<Action>,
}

/// Modules with at least one allowed action, in menu order.
pub fn visible_modules(session: Option<&Session>) -> Vec<ModuleAccess> {
    Module::iter()
        .filter_map(|module| {
            let actions: Vec<Action> = Action::iter()
                .filter(|action| can(session, module, *action))
                .collect();
            (!actions.is_empty()).then_some(ModuleAccess { module, actions })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt;
    use serde_json::json;

    fn session(role: Role, permissions: PermissionMap) -> Session {
        Session {
            user_id: 1,
            email: "someone@example.com".into(),
            role,
            branch_ids: vec![1],
            permissions,
        }
    }

    fn all_pairs() -> impl Iterator<Item = (Module, Action)> {
        Module::iter().flat_map(|m| Action::iter().map(move |a| (m, a)))
    }

    #[test]
    fn admin_is_allowed_everything_even_with_empty_map() {
        let admin = session(Role::Admin, PermissionMap::new());
        for (module, action) in all_pairs() {
            assert!(can(Some(&admin), module, action), "{module}:{action}");
        }
    }

    #[test]
    fn default_user_sees_only_branch_and_employee_lists() {
        let user = session(Role::User, resolve_permissions(Role::User, None));
        for (module, action) in all_pairs().filter(|(m, _)| *m != Module::ALWAYS_VISIBLE) {
            let expected = action == Action::View
                && matches!(module, Module::Branches | Module::Employees);
            assert_eq!(can(Some(&user), module, action), expected, "{module}:{action}");
        }
    }

    #[test]
    fn dashboard_visible_without_session() {
        for action in Action::iter() {
            assert!(can(None, Module::Dashboard, action));
        }
        assert!(can_named(None, "dashboard", "anything"));
    }

    #[test]
    fn no_session_denies_every_other_module() {
        for (module, action) in all_pairs().filter(|(m, _)| *m != Module::ALWAYS_VISIBLE) {
            assert!(!can(None, module, action), "{module}:{action}");
        }
    }

    #[test]
    fn explicit_map_scenario() {
        let map: PermissionMap = serde_json::from_value(json!({ "branches": ["view"] })).unwrap();
        let user = session(Role::User, resolve_permissions(Role::User, Some(map)));
        assert!(!can(Some(&user), Module::Branches, Action::Edit));
        assert!(can(Some(&user), Module::Branches, Action::View));
        // explicit map replaces the defaults entirely
        assert!(!can(Some(&user), Module::Employees, Action::View));
    }

    #[test]
    fn unknown_names_deny() {
        let admin = session(Role::Admin, PermissionMap::full());
        assert!(!can_named(Some(&admin), "payroll", "view"));
        assert!(!can_named(Some(&admin), "branches", "approve"));
        assert!(can_named(Some(&admin), "branches", "delete"));
    }

    #[test]
    fn defaults_survive_serialization_round_trips() {
        for role in Role::iter() {
            let original = session(role, resolve_permissions(role, None));

            let from_json = Session::from_json(&original.to_json()).unwrap();
            let token = jwt::issue_session_token(&original, "secret", 60).unwrap().0;
            let from_token = jwt::verify_token(&token, "secret").unwrap().session;

            for (module, action) in all_pairs() {
                let expected = can(Some(&original), module, action);
                assert_eq!(can(Some(&from_json), module, action), expected);
                assert_eq!(can(Some(&from_token), module, action), expected);
            }
        }
    }

    #[test]
    fn navigation_lists_allowed_modules_only() {
        let user = session(Role::User, resolve_permissions(Role::User, None));
        let modules: Vec<Module> = visible_modules(Some(&user)).into_iter().map(|m| m.module).collect();
        assert_eq!(modules, vec![Module::Dashboard, Module::Branches, Module::Employees]);

        let anonymous = visible_modules(None);
        assert_eq!(anonymous.len(), 1);
        assert_eq!(anonymous[0].actions.len(), 4);
    }
}
