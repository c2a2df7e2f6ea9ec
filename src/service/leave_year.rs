use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    error::{AppError, AppResult},
    model::leave_year::LeaveYear,
};

const SELECT_YEAR: &str =
    "SELECT id, name, start_date, end_date, is_current, created_at FROM leave_years";

/// Both `leaves` and `archived_leaves` hold the year with ON DELETE RESTRICT.
const YEAR_IN_USE: &str = "Leave year still has leaves or archived leaves";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_year_range", skip_on_field_errors = false))]
pub struct LeaveYearInput {
    #[validate(length(min = 1, max = 50, message = "Name is required"))]
    #[schema(example = "2026")]
    pub name: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Makes this the current year, clearing the flag elsewhere.
    #[serde(default)]
    pub is_current: bool,
}

fn validate_year_range(input: &LeaveYearInput) -> Result<(), ValidationError> {
    if input.start_date > input.end_date {
        let mut error = ValidationError::new("date_range");
        error.message = Some("Start date must not be after end date".into());
        return Err(error);
    }
    Ok(())
}

pub async fn list(pool: &PgPool) -> AppResult<Vec<LeaveYear>> {
    let sql = format!("{SELECT_YEAR} ORDER BY start_date DESC");
    Ok(sqlx::query_as::<_, LeaveYear>(&sql).fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> AppResult<LeaveYear> {
    let sql = format!("{SELECT_YEAR} WHERE id = $1");
    sqlx::query_as::<_, LeaveYear>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Leave year"))
}

pub async fn current(pool: &PgPool) -> AppResult<Option<LeaveYear>> {
    let sql = format!("{SELECT_YEAR} WHERE is_current LIMIT 1");
    Ok(sqlx::query_as::<_, LeaveYear>(&sql).fetch_optional(pool).await?)
}

pub async fn create(pool: &PgPool, input: &LeaveYearInput) -> AppResult<LeaveYear> {
    let mut tx = pool.begin().await?;

    if input.is_current {
        sqlx::query("UPDATE leave_years SET is_current = FALSE WHERE is_current")
            .execute(&mut *tx)
            .await?;
    }

    let year = sqlx::query_as::<_, LeaveYear>(
        r#"
        INSERT INTO leave_years (name, start_date, end_date, is_current)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, start_date, end_date, is_current, created_at
        "#,
    )
    .bind(input.name.trim())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.is_current)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "A leave year with this name already exists"))?;

    tx.commit().await?;
    Ok(year)
}

/// Leaves already booked must still fit the new range.
pub async fn update(pool: &PgPool, id: i64, input: &LeaveYearInput) -> AppResult<LeaveYear> {
    let mut tx = pool.begin().await?;

    let outside = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leaves
        WHERE leave_year_id = $1 AND (start_date < $2 OR end_date > $3)
        "#,
    )
    .bind(id)
    .bind(input.start_date)
    .bind(input.end_date)
    .fetch_one(&mut *tx)
    .await?;

    if outside > 0 {
        return Err(AppError::field(
            "start_date",
            "leaves_outside_range",
            "Existing leaves fall outside the new date range",
        ));
    }

    if input.is_current {
        sqlx::query("UPDATE leave_years SET is_current = FALSE WHERE is_current AND id <> $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let year = sqlx::query_as::<_, LeaveYear>(
        r#"
        UPDATE leave_years
        SET name = $1, start_date = $2, end_date = $3, is_current = $4
        WHERE id = $5
        RETURNING id, name, start_date, end_date, is_current, created_at
        "#,
    )
    .bind(input.name.trim())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.is_current)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "A leave year with this name already exists"))?
    .ok_or(AppError::NotFound("Leave year"))?;

    tx.commit().await?;
    Ok(year)
}

pub async fn set_current(pool: &PgPool, id: i64) -> AppResult<LeaveYear> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE leave_years SET is_current = FALSE WHERE is_current AND id <> $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let year = sqlx::query_as::<_, LeaveYear>(
        r#"
        UPDATE leave_years SET is_current = TRUE WHERE id = $1
        RETURNING id, name, start_date, end_date, is_current, created_at
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Leave year"))?;

    tx.commit().await?;
    Ok(year)
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM leave_years WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_constraint(e, YEAR_IN_USE))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Leave year"));
    }
    Ok(())
}

/// Moves every leave of the year into `archived_leaves`. Returns how many
/// were moved.
pub async fn archive(pool: &PgPool, id: i64) -> AppResult<u64> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM leave_years WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(AppError::NotFound("Leave year"));
    }

    sqlx::query(
        r#"
        INSERT INTO archived_leaves
            (id, employee_id, leave_year_id, leave_type, start_date, end_date, duration, notes, created_at)
        SELECT id, employee_id, leave_year_id, leave_type, start_date, end_date, duration, notes, created_at
        FROM leaves
        WHERE leave_year_id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let moved = sqlx::query("DELETE FROM leaves WHERE leave_year_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    info!(leave_year_id = id, moved, "Leave year archived");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(start: (i32, u32, u32), end: (i32, u32, u32)) -> LeaveYearInput {
        LeaveYearInput {
            name: "2026".into(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            is_current: false,
        }
    }

    #[test]
    fn inverted_year_is_rejected() {
        assert!(input((2026, 12, 31), (2026, 1, 1)).validate().is_err());
    }

    #[test]
    fn single_day_year_is_accepted() {
        assert!(input((2026, 1, 1), (2026, 1, 1)).validate().is_ok());
    }

    #[test]
    fn in_use_message_does_not_point_at_archiving() {
        // archived rows block the delete as much as live ones
        assert!(YEAR_IN_USE.contains("archived leaves"));
        assert!(!YEAR_IN_USE.contains("archive them"));
    }
}
