use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "code": "EMP-001",
        "branch_id": 1,
        "branch_name": "Head Office",
        "job_title": "Accountant",
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "EMP-001")]
    pub code: String,

    #[schema(example = 1)]
    pub branch_id: i64,

    /// Joined from `branches`, absent when the branch row is gone.
    #[schema(example = "Head Office", nullable = true)]
    pub branch_name: Option<String>,

    #[schema(example = "Accountant", nullable = true)]
    pub job_title: Option<String>,

    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
