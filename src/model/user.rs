use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::model::{permission::PermissionMap, role::Role};

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub permissions: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// User record as exposed by the API, never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// Branch scope; ignored for admins.
    pub branch_ids: Vec<i64>,
    /// Explicit permission map, `null` when role defaults apply.
    #[schema(value_type = Option<Object>)]
    pub permissions: Option<PermissionMap>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> Role {
        Role::from_db(&self.role)
    }

    /// A JSON `null` in the column counts as absent.
    pub fn permission_map(&self) -> Option<PermissionMap> {
        self.permissions
            .as_ref()
            .filter(|v| !v.is_null())
            .map(PermissionMap::from_value)
    }

    pub fn into_user(self, branch_ids: Vec<i64>) -> User {
        User {
            id: self.id,
            role: self.role(),
            permissions: self.permission_map(),
            email: self.email,
            branch_ids,
            created_at: self.created_at,
        }
    }
}
