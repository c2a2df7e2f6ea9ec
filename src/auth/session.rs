use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::permission::resolve_permissions,
    model::{permission::PermissionMap, role::Role, user::UserRow},
};

/// The signed-in user as carried by the session token.
///
/// Written at login (with the permission map already resolved) and cleared at
/// logout; every other component only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub branch_ids: Vec<i64>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub permissions: PermissionMap,
}

/// Rows a session may read: all of them for admins, otherwise those of the
/// branches in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchScope {
    All,
    Only(Vec<i64>),
}

impl BranchScope {
    /// `None` means unrestricted; bound as a nullable `BIGINT[]`.
    pub fn branch_ids(&self) -> Option<Vec<i64>> {
        match self {
            BranchScope::All => None,
            BranchScope::Only(ids) => Some(ids.clone()),
        }
    }

    pub fn includes(&self, branch_id: i64) -> bool {
        match self {
            BranchScope::All => true,
            BranchScope::Only(ids) => ids.contains(&branch_id),
        }
    }
}

impl Session {
    /// Builds the session for a freshly authenticated user, synthesizing the
    /// role defaults when the record carries no permission map.
    pub fn initialize(user: &UserRow, branch_ids: Vec<i64>) -> Self {
        let role = user.role();
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role,
            branch_ids,
            permissions: resolve_permissions(role, user.permission_map()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn branch_scope(&self) -> BranchScope {
        if self.is_admin() {
            BranchScope::All
        } else {
            BranchScope::Only(self.branch_ids.clone())
        }
    }

    /// Loads a stored session; anything unreadable is no session at all.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub session: Session,
}
