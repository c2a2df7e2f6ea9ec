use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "company_name": "Acme Trading",
    "annual_leave_days": 30,
    "document_warning_days": 30,
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct Settings {
    pub company_name: String,
    /// Yearly entitlement for annual leave.
    pub annual_leave_days: i32,
    /// Documents expiring within this many days are flagged.
    pub document_warning_days: i32,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
