use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    auth::session::BranchScope,
    error::{AppError, AppResult},
    model::document::{DocumentRecord, DocumentStatus, DocumentView},
    service::{employee, settings},
};

const SELECT_DOCUMENT: &str = r#"
    SELECT d.id, d.employee_id, e.name AS employee_name, e.branch_id,
           d.passport_expiry, d.visa_expiry, d.id_card_expiry, d.contract_expiry,
           d.notes, d.updated_at
    FROM document_tracker d
    JOIN employees e ON e.id = d.employee_id
"#;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DocumentInput {
    #[schema(format = "date", value_type = Option<String>, example = "2030-05-01")]
    pub passport_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub visa_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub id_card_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub contract_expiry: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DocumentQuery {
    /// Keep only records with this overall status
    #[param(value_type = Option<String>)]
    pub status: Option<DocumentStatus>,
    /// Filter by the employee's branch
    pub branch_id: Option<i64>,
}

/// Keeps the views matching the requested status, most urgent first.
pub fn select(mut views: Vec<DocumentView>, status: Option<DocumentStatus>) -> Vec<DocumentView> {
    if let Some(status) = status {
        views.retain(|v| v.status == status);
    }
    views.sort_by(|a, b| {
        b.status
            .cmp(&a.status)
            .then_with(|| earliest_expiry(a).cmp(&earliest_expiry(b)))
    });
    views
}

fn earliest_expiry(view: &DocumentView) -> Option<NaiveDate> {
    view.documents.iter().filter_map(|d| d.expiry).min()
}

async fn warning_days(pool: &PgPool) -> AppResult<i64> {
    Ok(i64::from(settings::get(pool).await?.document_warning_days))
}

pub async fn list(
    pool: &PgPool,
    scope: &BranchScope,
    query: &DocumentQuery,
) -> AppResult<Vec<DocumentView>> {
    let sql = format!(
        "{SELECT_DOCUMENT} WHERE ($1::BIGINT[] IS NULL OR e.branch_id = ANY($1)) \
         AND ($2::BIGINT IS NULL OR e.branch_id = $2)"
    );
    let records = sqlx::query_as::<_, DocumentRecord>(&sql)
        .bind(scope.branch_ids())
        .bind(query.branch_id)
        .fetch_all(pool)
        .await?;

    let today = Utc::now().date_naive();
    let warning = warning_days(pool).await?;
    let views = records
        .into_iter()
        .map(|r| r.into_view(today, warning))
        .collect();

    Ok(select(views, query.status))
}

/// Expired and soon-to-expire records.
pub async fn attention_needed(pool: &PgPool, scope: &BranchScope) -> AppResult<Vec<DocumentView>> {
    let all = list(pool, scope, &DocumentQuery::default()).await?;
    Ok(all
        .into_iter()
        .filter(|v| v.status >= DocumentStatus::ExpiringSoon)
        .collect())
}

pub async fn get_for_employee(
    pool: &PgPool,
    scope: &BranchScope,
    employee_id: i64,
) -> AppResult<DocumentView> {
    employee::get(pool, scope, employee_id).await?;

    let sql = format!("{SELECT_DOCUMENT} WHERE d.employee_id = $1");
    let record = sqlx::query_as::<_, DocumentRecord>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Document record"))?;

    Ok(record.into_view(Utc::now().date_naive(), warning_days(pool).await?))
}

pub async fn upsert(
    pool: &PgPool,
    scope: &BranchScope,
    employee_id: i64,
    input: &DocumentInput,
) -> AppResult<DocumentView> {
    employee::get(pool, scope, employee_id).await?;

    sqlx::query(
        r#"
        INSERT INTO document_tracker
            (employee_id, passport_expiry, visa_expiry, id_card_expiry, contract_expiry, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (employee_id) DO UPDATE
        SET passport_expiry = EXCLUDED.passport_expiry,
            visa_expiry = EXCLUDED.visa_expiry,
            id_card_expiry = EXCLUDED.id_card_expiry,
            contract_expiry = EXCLUDED.contract_expiry,
            notes = EXCLUDED.notes,
            updated_at = NOW()
        "#,
    )
    .bind(employee_id)
    .bind(input.passport_expiry)
    .bind(input.visa_expiry)
    .bind(input.id_card_expiry)
    .bind(input.contract_expiry)
    .bind(input.notes.as_deref())
    .execute(pool)
    .await?;

    get_for_employee(pool, scope, employee_id).await
}

pub async fn delete(pool: &PgPool, scope: &BranchScope, id: i64) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM document_tracker d
        USING employees e
        WHERE d.id = $1 AND e.id = d.employee_id
          AND ($2::BIGINT[] IS NULL OR e.branch_id = ANY($2))
        "#,
    )
    .bind(id)
    .bind(scope.branch_ids())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Document record"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(employee_id: i64, passport: Option<NaiveDate>) -> DocumentView {
        DocumentRecord {
            id: employee_id,
            employee_id,
            employee_name: None,
            branch_id: Some(1),
            passport_expiry: passport,
            visa_expiry: None,
            id_card_expiry: None,
            contract_expiry: None,
            notes: None,
            updated_at: Utc::now(),
        }
        .into_view(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), 30)
    }

    fn day(m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, m, d)
    }

    #[test]
    fn most_urgent_first() {
        let views = vec![
            view(1, day(12, 1)),
            view(2, day(6, 20)),
            view(3, day(5, 1)),
            view(4, None),
            view(5, day(6, 5)),
        ];
        let order: Vec<i64> = select(views, None)
            .iter()
            .map(|v| v.record.employee_id)
            .collect();
        assert_eq!(order, vec![3, 5, 2, 1, 4]);
    }

    #[test]
    fn status_filter() {
        let views = vec![view(1, day(12, 1)), view(2, day(6, 20)), view(3, day(5, 1))];
        let expiring = select(views, Some(DocumentStatus::ExpiringSoon));
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].record.employee_id, 2);
    }
}
