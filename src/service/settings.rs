use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppResult, model::settings::Settings};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SettingsInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    #[schema(example = "Acme Trading")]
    pub company_name: String,
    #[validate(range(min = 0, max = 366, message = "Must be between 0 and 366 days"))]
    #[schema(example = 30)]
    pub annual_leave_days: i32,
    #[validate(range(min = 0, max = 365, message = "Must be between 0 and 365 days"))]
    #[schema(example = 30)]
    pub document_warning_days: i32,
}

/// The single settings row; seeded by the initial migration.
pub async fn get(pool: &PgPool) -> AppResult<Settings> {
    let settings = sqlx::query_as::<_, Settings>(
        r#"
        SELECT company_name, annual_leave_days, document_warning_days, updated_at
        FROM settings
        WHERE id = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

pub async fn update(pool: &PgPool, input: &SettingsInput) -> AppResult<Settings> {
    let settings = sqlx::query_as::<_, Settings>(
        r#"
        INSERT INTO settings (id, company_name, annual_leave_days, document_warning_days)
        VALUES (1, $1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET company_name = EXCLUDED.company_name,
            annual_leave_days = EXCLUDED.annual_leave_days,
            document_warning_days = EXCLUDED.document_warning_days,
            updated_at = NOW()
        RETURNING company_name, annual_leave_days, document_warning_days, updated_at
        "#,
    )
    .bind(input.company_name.trim())
    .bind(input.annual_leave_days)
    .bind(input.document_warning_days)
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        let input = SettingsInput {
            company_name: String::new(),
            annual_leave_days: 400,
            document_warning_days: 30,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("company_name"));
        assert!(fields.contains_key("annual_leave_days"));
        assert!(!fields.contains_key("document_warning_days"));
    }
}
