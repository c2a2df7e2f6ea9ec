use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::password::{MIN_PASSWORD_LEN, hash_password, verify_password},
    error::{AppError, AppResult},
    model::{
        permission::PermissionMap,
        role::Role,
        user::{User, UserRow},
    },
};

const SELECT_USER: &str =
    "SELECT id, email, password_hash, role, permissions, created_at FROM users";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(email(message = "Enter a valid email address"))]
    #[schema(example = "clerk@example.com")]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[schema(example = "user")]
    pub role: Role,
    #[serde(default)]
    pub branch_ids: Vec<i64>,
    /// Explicit permission map; omit to use the role defaults.
    #[schema(value_type = Option<Object>, example = json!({ "branches": ["view"], "leaves": ["view", "create"] }))]
    pub permissions: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserInput {
    pub role: Role,
    #[serde(default)]
    pub branch_ids: Vec<i64>,
    /// Explicit permission map; `null` or absent resets to role defaults.
    #[schema(value_type = Option<Object>)]
    pub permissions: Option<Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordInput {
    pub current_password: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Normalized map to store, `None` to fall back on role defaults.
fn stored_permissions(raw: Option<&Value>) -> Option<Value> {
    raw.filter(|v| !v.is_null())
        .map(|v| PermissionMap::from_value(v).to_value())
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<UserRow>> {
    let sql = format!("{SELECT_USER} WHERE lower(email) = lower($1)");
    Ok(sqlx::query_as::<_, UserRow>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?)
}

pub async fn branch_ids(pool: &PgPool, user_id: i64) -> AppResult<Vec<i64>> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT branch_id FROM user_branches WHERE user_id = $1 ORDER BY branch_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

#[derive(sqlx::FromRow)]
struct UserWithBranches {
    #[sqlx(flatten)]
    user: UserRow,
    branch_ids: Vec<i64>,
}

const SELECT_USER_WITH_BRANCHES: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.role, u.permissions, u.created_at,
           COALESCE(
               array_agg(ub.branch_id ORDER BY ub.branch_id) FILTER (WHERE ub.branch_id IS NOT NULL),
               '{}'
           ) AS branch_ids
    FROM users u
    LEFT JOIN user_branches ub ON ub.user_id = u.id
"#;

pub async fn list(pool: &PgPool) -> AppResult<Vec<User>> {
    let sql = format!("{SELECT_USER_WITH_BRANCHES} GROUP BY u.id ORDER BY u.email");
    let rows = sqlx::query_as::<_, UserWithBranches>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| r.user.into_user(r.branch_ids))
        .collect())
}

pub async fn get(pool: &PgPool, id: i64) -> AppResult<User> {
    let sql = format!("{SELECT_USER_WITH_BRANCHES} WHERE u.id = $1 GROUP BY u.id");
    let row = sqlx::query_as::<_, UserWithBranches>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(row.user.into_user(row.branch_ids))
}

async fn replace_branches(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    branch_ids: &[i64],
) -> AppResult<()> {
    sqlx::query("DELETE FROM user_branches WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    if !branch_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO user_branches (user_id, branch_id)
            SELECT $1, unnest($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(branch_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::from_constraint(e, "Unknown branch in branch scope"))?;
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: &CreateUserInput) -> AppResult<User> {
    let hashed = hash_password(&input.password)?;
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (email, password_hash, role, permissions)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(input.email.trim().to_lowercase())
    .bind(hashed)
    .bind(input.role.as_ref())
    .bind(stored_permissions(input.permissions.as_ref()))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "Email already registered"))?;

    replace_branches(&mut tx, id, &input.branch_ids).await?;
    tx.commit().await?;

    get(pool, id).await
}

pub async fn update(pool: &PgPool, id: i64, input: &UpdateUserInput) -> AppResult<User> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE users SET role = $1, permissions = $2 WHERE id = $3")
        .bind(input.role.as_ref())
        .bind(stored_permissions(input.permissions.as_ref()))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }

    replace_branches(&mut tx, id, &input.branch_ids).await?;
    tx.commit().await?;

    get(pool, id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User"));
    }
    Ok(())
}

pub async fn change_password(
    pool: &PgPool,
    user_id: i64,
    input: &ChangePasswordInput,
) -> AppResult<()> {
    let sql = format!("{SELECT_USER} WHERE id = $1");
    let user = sqlx::query_as::<_, UserRow>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !verify_password(&input.current_password, &user.password_hash) {
        return Err(AppError::field(
            "current_password",
            "mismatch",
            "Current password is incorrect",
        ));
    }

    let hashed = hash_password(&input.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(hashed)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_input(password: &str, confirm: &str) -> CreateUserInput {
        CreateUserInput {
            email: "new@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            role: Role::User,
            branch_ids: vec![1],
            permissions: None,
        }
    }

    #[test]
    fn password_confirmation_must_match() {
        let errors = create_input("longenough", "different1").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn password_minimum_length() {
        let errors = create_input("short", "short").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("confirm_password"));
    }

    #[test]
    fn valid_input_passes() {
        assert!(create_input("longenough", "longenough").validate().is_ok());
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut input = create_input("longenough", "longenough");
        input.email = "not-an-email".into();
        assert!(input.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn stored_permissions_are_normalized() {
        assert_eq!(stored_permissions(None), None);
        assert_eq!(stored_permissions(Some(&Value::Null)), None);
        assert_eq!(
            stored_permissions(Some(&json!({ "leaves": ["create", "view", "jump"], "x": ["view"] }))),
            Some(json!({ "leaves": ["view", "create"] }))
        );
    }

    #[test]
    fn change_password_validation() {
        let input = ChangePasswordInput {
            current_password: "old".into(),
            new_password: "brand-new-pass".into(),
            confirm_password: "brand-new-pas".into(),
        };
        assert!(input.validate().unwrap_err().field_errors().contains_key("confirm_password"));
    }
}
