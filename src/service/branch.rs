use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::session::BranchScope,
    error::{AppError, AppResult},
    model::branch::Branch,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BranchInput {
    #[validate(length(min = 1, max = 120, message = "Branch name is required"))]
    #[schema(example = "Head Office")]
    pub name: String,
}

pub async fn list(pool: &PgPool, scope: &BranchScope) -> AppResult<Vec<Branch>> {
    let branches = sqlx::query_as::<_, Branch>(
        r#"
        SELECT id, name, created_at
        FROM branches
        WHERE ($1::BIGINT[] IS NULL OR id = ANY($1))
        ORDER BY name
        "#,
    )
    .bind(scope.branch_ids())
    .fetch_all(pool)
    .await?;

    Ok(branches)
}

pub async fn count(pool: &PgPool, scope: &BranchScope) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM branches WHERE ($1::BIGINT[] IS NULL OR id = ANY($1))",
    )
    .bind(scope.branch_ids())
    .fetch_one(pool)
    .await?;

    Ok(total)
}

pub async fn get(pool: &PgPool, scope: &BranchScope, id: i64) -> AppResult<Branch> {
    if !scope.includes(id) {
        return Err(AppError::NotFound("Branch"));
    }

    sqlx::query_as::<_, Branch>("SELECT id, name, created_at FROM branches WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Branch"))
}

pub async fn create(pool: &PgPool, input: &BranchInput) -> AppResult<Branch> {
    sqlx::query_as::<_, Branch>(
        "INSERT INTO branches (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(input.name.trim())
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "A branch with this name already exists"))
}

pub async fn update(pool: &PgPool, id: i64, input: &BranchInput) -> AppResult<Branch> {
    sqlx::query_as::<_, Branch>(
        "UPDATE branches SET name = $1 WHERE id = $2 RETURNING id, name, created_at",
    )
    .bind(input.name.trim())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "A branch with this name already exists"))?
    .ok_or(AppError::NotFound("Branch"))
}

/// Refused while employees still belong to the branch.
pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM branches WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Branch still has employees"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Branch"));
    }
    Ok(())
}
