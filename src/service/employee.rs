use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::session::BranchScope,
    error::{AppError, AppResult},
    model::employee::Employee,
    utils::db_utils::{Page, SqlFilter, SqlValue, like_pattern},
};

const SELECT_EMPLOYEE: &str = r#"
    SELECT e.id, e.name, e.code, e.branch_id, b.name AS branch_name, e.job_title, e.created_at
    FROM employees e
    LEFT JOIN branches b ON b.id = e.branch_id
"#;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmployeeInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "John Doe")]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Employee code is required"))]
    #[schema(example = "EMP-001")]
    pub code: String,
    #[schema(example = 1)]
    pub branch_id: i64,
    #[validate(length(max = 120, message = "Job title is too long"))]
    #[schema(example = "Accountant", nullable = true)]
    pub job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    /// Filter by branch
    pub branch_id: Option<i64>,
    /// Search by name, code or job title
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

pub(crate) fn list_filter(scope: &BranchScope, query: &EmployeeQuery) -> SqlFilter {
    let mut filter = SqlFilter::new();
    filter
        .push_opt("e.branch_id = ANY({})", scope.branch_ids())
        .push_opt("e.branch_id = {}", query.branch_id);

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filter.push(
            "(e.name ILIKE {} OR e.code ILIKE {} OR e.job_title ILIKE {})",
            SqlValue::Text(like_pattern(search)),
        );
    }
    filter
}

pub async fn list(
    pool: &PgPool,
    scope: &BranchScope,
    query: &EmployeeQuery,
) -> AppResult<EmployeeListResponse> {
    let page = Page::new(query.page, query.per_page);
    let filter = list_filter(scope, query);
    let where_clause = filter.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM employees e{where_clause}");
    debug!(sql = %count_sql, "Counting employees");
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await?;

    let next = filter.next_param();
    let data_sql = format!(
        "{SELECT_EMPLOYEE}{where_clause} ORDER BY e.name, e.id LIMIT ${} OFFSET ${}",
        next,
        next + 1
    );
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching employees");
    let data = filter
        .bind_as(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok(EmployeeListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    })
}

pub async fn count(pool: &PgPool, scope: &BranchScope) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM employees WHERE ($1::BIGINT[] IS NULL OR branch_id = ANY($1))",
    )
    .bind(scope.branch_ids())
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Rows outside the scope behave as missing.
pub async fn get(pool: &PgPool, scope: &BranchScope, id: i64) -> AppResult<Employee> {
    let sql = format!("{SELECT_EMPLOYEE} WHERE e.id = $1");
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .filter(|e| scope.includes(e.branch_id));

    employee.ok_or(AppError::NotFound("Employee"))
}

pub async fn create(pool: &PgPool, input: &EmployeeInput) -> AppResult<Employee> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO employees (name, code, branch_id, job_title)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(input.name.trim())
    .bind(input.code.trim())
    .bind(input.branch_id)
    .bind(input.job_title.as_deref().map(str::trim))
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Employee code already exists or branch is unknown"))?;

    get(pool, &BranchScope::All, id).await
}

pub async fn update(pool: &PgPool, id: i64, input: &EmployeeInput) -> AppResult<Employee> {
    let result = sqlx::query(
        r#"
        UPDATE employees
        SET name = $1, code = $2, branch_id = $3, job_title = $4
        WHERE id = $5
        "#,
    )
    .bind(input.name.trim())
    .bind(input.code.trim())
    .bind(input.branch_id)
    .bind(input.job_title.as_deref().map(str::trim))
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Employee code already exists or branch is unknown"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Employee"));
    }
    get(pool, &BranchScope::All, id).await
}

/// Leaves and the document record go with the employee (cascade).
pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Employee"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_without_filters_has_no_where() {
        let filter = list_filter(&BranchScope::All, &EmployeeQuery::default());
        assert_eq!(filter.where_clause(), "");
    }

    #[test]
    fn scoped_search_filter() {
        let query = EmployeeQuery {
            search: Some("ann".into()),
            branch_id: Some(2),
            ..Default::default()
        };
        let filter = list_filter(&BranchScope::Only(vec![2, 3]), &query);
        assert_eq!(
            filter.where_clause(),
            " WHERE e.branch_id = ANY($1) AND e.branch_id = $2 AND \
             (e.name ILIKE $3 OR e.code ILIKE $3 OR e.job_title ILIKE $3)"
        );
        assert_eq!(filter.next_param(), 4);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = EmployeeQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(list_filter(&BranchScope::All, &query).where_clause(), "");
    }

    #[test]
    fn input_validation() {
        let input = EmployeeInput {
            name: "".into(),
            code: "EMP-1".into(),
            branch_id: 1,
            job_title: Some("x".repeat(121)),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("job_title"));
    }
}
