use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    auth::session::BranchScope,
    error::{AppError, AppResult},
    model::{
        leave::{ArchivedLeave, Leave, LeaveType, leave_duration},
        leave_year::LeaveYear,
    },
    service::{employee, leave_year, settings},
    utils::db_utils::{Page, SqlFilter},
};

const SELECT_LEAVE: &str = r#"
    SELECT l.id, l.employee_id, e.name AS employee_name, l.leave_year_id, l.leave_type,
           l.start_date, l.end_date, l.duration, l.notes, l.created_at
    FROM leaves l
    JOIN employees e ON e.id = l.employee_id
"#;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_leave_range", skip_on_field_errors = false))]
pub struct LeaveInput {
    #[schema(example = 1)]
    pub employee_id: i64,
    /// Defaults to the current leave year.
    #[schema(example = 1, nullable = true)]
    pub leave_year_id: Option<i64>,
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    #[schema(example = "Family trip", nullable = true)]
    pub notes: Option<String>,
}

fn validate_leave_range(input: &LeaveInput) -> Result<(), ValidationError> {
    if input.start_date > input.end_date {
        let mut error = ValidationError::new("date_range");
        error.message = Some("Start date must not be after end date".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaveQuery {
    /// Filter by employee
    pub employee_id: Option<i64>,
    /// Filter by leave year
    pub leave_year_id: Option<i64>,
    /// Filter by the employee's branch
    pub branch_id: Option<i64>,
    /// Filter by leave type
    #[param(value_type = Option<String>)]
    pub leave_type: Option<LeaveType>,
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<Leave>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct LeaveBalance {
    pub employee_id: i64,
    pub leave_year_id: i64,
    /// Annual leave days granted per year.
    pub entitlement: i64,
    /// Annual leave days booked.
    pub used: i64,
    /// Negative when over-booked.
    pub remaining: i64,
    /// Booked days per leave type.
    pub by_type: BTreeMap<String, i64>,
}

/// Checks the range against the leave year and returns the derived duration.
pub fn check_range(
    start: NaiveDate,
    end: NaiveDate,
    year: &LeaveYear,
) -> Result<i32, AppError> {
    let duration = leave_duration(start, end).ok_or_else(|| {
        AppError::field("end_date", "date_range", "Start date must not be after end date")
    })?;

    if !year.contains_range(start, end) {
        return Err(AppError::field(
            "end_date",
            "outside_leave_year",
            "Leave must fall inside its leave year",
        ));
    }

    Ok(duration)
}

pub fn compute_balance(
    employee_id: i64,
    leave_year_id: i64,
    entitlement: i64,
    totals: Vec<(String, i64)>,
) -> LeaveBalance {
    let by_type: BTreeMap<String, i64> = totals.into_iter().collect();
    let used = by_type
        .iter()
        .filter(|(kind, _)| {
            kind.parse::<LeaveType>()
                .is_ok_and(|t| t.counts_against_entitlement())
        })
        .map(|(_, days)| *days)
        .sum();

    LeaveBalance {
        employee_id,
        leave_year_id,
        entitlement,
        used,
        remaining: entitlement - used,
        by_type,
    }
}

async fn resolve_year(pool: &PgPool, leave_year_id: Option<i64>) -> AppResult<LeaveYear> {
    match leave_year_id {
        Some(id) => leave_year::get(pool, id).await,
        None => leave_year::current(pool).await?.ok_or_else(|| {
            AppError::field(
                "leave_year_id",
                "no_current_year",
                "No current leave year is set; choose one",
            )
        }),
    }
}

pub(crate) fn list_filter(scope: &BranchScope, query: &LeaveQuery) -> SqlFilter {
    let mut filter = SqlFilter::new();
    filter
        .push_opt("e.branch_id = ANY({})", scope.branch_ids())
        .push_opt("l.employee_id = {}", query.employee_id)
        .push_opt("l.leave_year_id = {}", query.leave_year_id)
        .push_opt("e.branch_id = {}", query.branch_id)
        .push_opt(
            "l.leave_type = {}",
            query.leave_type.map(|t| t.as_str().to_string()),
        );
    filter
}

pub async fn list(
    pool: &PgPool,
    scope: &BranchScope,
    query: &LeaveQuery,
) -> AppResult<LeaveListResponse> {
    let page = Page::new(query.page, query.per_page);
    let filter = list_filter(scope, query);
    let where_clause = filter.where_clause();

    let count_sql = format!(
        "SELECT COUNT(*) FROM leaves l JOIN employees e ON e.id = l.employee_id{where_clause}"
    );
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count leaves");
            e
        })?;

    let next = filter.next_param();
    let data_sql = format!(
        "{SELECT_LEAVE}{where_clause} ORDER BY l.start_date DESC, l.id DESC LIMIT ${} OFFSET ${}",
        next,
        next + 1
    );
    let data = filter
        .bind_as(sqlx::query_as::<_, Leave>(&data_sql))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok(LeaveListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    })
}

pub async fn get(pool: &PgPool, scope: &BranchScope, id: i64) -> AppResult<Leave> {
    let sql = format!(
        "{SELECT_LEAVE} WHERE l.id = $1 AND ($2::BIGINT[] IS NULL OR e.branch_id = ANY($2))"
    );
    sqlx::query_as::<_, Leave>(&sql)
        .bind(id)
        .bind(scope.branch_ids())
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Leave"))
}

pub async fn create(pool: &PgPool, scope: &BranchScope, input: &LeaveInput) -> AppResult<Leave> {
    employee::get(pool, scope, input.employee_id).await?;
    let year = resolve_year(pool, input.leave_year_id).await?;
    let duration = check_range(input.start_date, input.end_date, &year)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO leaves
            (employee_id, leave_year_id, leave_type, start_date, end_date, duration, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(input.employee_id)
    .bind(year.id)
    .bind(input.leave_type.as_str())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(duration)
    .bind(input.notes.as_deref())
    .fetch_one(pool)
    .await?;

    get(pool, &BranchScope::All, id).await
}

pub async fn update(
    pool: &PgPool,
    scope: &BranchScope,
    id: i64,
    input: &LeaveInput,
) -> AppResult<Leave> {
    let existing = get(pool, scope, id).await?;
    employee::get(pool, scope, input.employee_id).await?;
    let year = resolve_year(pool, input.leave_year_id.or(Some(existing.leave_year_id))).await?;
    let duration = check_range(input.start_date, input.end_date, &year)?;

    sqlx::query(
        r#"
        UPDATE leaves
        SET employee_id = $1, leave_year_id = $2, leave_type = $3,
            start_date = $4, end_date = $5, duration = $6, notes = $7
        WHERE id = $8
        "#,
    )
    .bind(input.employee_id)
    .bind(year.id)
    .bind(input.leave_type.as_str())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(duration)
    .bind(input.notes.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, &BranchScope::All, id).await
}

pub async fn delete(pool: &PgPool, scope: &BranchScope, id: i64) -> AppResult<()> {
    get(pool, scope, id).await?;
    sqlx::query("DELETE FROM leaves WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Leaves covering `day`, for the dashboard.
pub async fn on_leave(pool: &PgPool, scope: &BranchScope, day: NaiveDate) -> AppResult<Vec<Leave>> {
    let sql = format!(
        "{SELECT_LEAVE} WHERE l.start_date <= $1 AND l.end_date >= $1 \
         AND ($2::BIGINT[] IS NULL OR e.branch_id = ANY($2)) ORDER BY e.name"
    );
    Ok(sqlx::query_as::<_, Leave>(&sql)
        .bind(day)
        .bind(scope.branch_ids())
        .fetch_all(pool)
        .await?)
}

pub async fn balance(
    pool: &PgPool,
    scope: &BranchScope,
    employee_id: i64,
    leave_year_id: Option<i64>,
) -> AppResult<LeaveBalance> {
    employee::get(pool, scope, employee_id).await?;
    let year = resolve_year(pool, leave_year_id).await?;
    let settings = settings::get(pool).await?;

    let totals = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT leave_type, COALESCE(SUM(duration), 0)::BIGINT
        FROM leaves
        WHERE employee_id = $1 AND leave_year_id = $2
        GROUP BY leave_type
        "#,
    )
    .bind(employee_id)
    .bind(year.id)
    .fetch_all(pool)
    .await?;

    Ok(compute_balance(
        employee_id,
        year.id,
        i64::from(settings.annual_leave_days),
        totals,
    ))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ArchivedLeaveQuery {
    pub employee_id: Option<i64>,
    pub leave_year_id: Option<i64>,
}

pub async fn list_archived(
    pool: &PgPool,
    scope: &BranchScope,
    query: &ArchivedLeaveQuery,
) -> AppResult<Vec<ArchivedLeave>> {
    let mut filter = SqlFilter::new();
    filter
        .push_opt("e.branch_id = ANY({})", scope.branch_ids())
        .push_opt("a.employee_id = {}", query.employee_id)
        .push_opt("a.leave_year_id = {}", query.leave_year_id);

    let sql = format!(
        r#"
        SELECT a.id, a.employee_id, e.name AS employee_name, a.leave_year_id, a.leave_type,
               a.start_date, a.end_date, a.duration, a.notes, a.created_at, a.archived_at
        FROM archived_leaves a
        JOIN employees e ON e.id = a.employee_id
        {}
        ORDER BY a.start_date DESC
        "#,
        filter.where_clause()
    );

    Ok(filter
        .bind_as(sqlx::query_as::<_, ArchivedLeave>(&sql))
        .fetch_all(pool)
        .await?)
}
