use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, AsRefStr,
    EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
    Emergency,
}

impl LeaveType {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// Only annual leave draws down the yearly entitlement.
    pub fn counts_against_entitlement(&self) -> bool {
        *self == LeaveType::Annual
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1,
    "employee_name": "John Doe",
    "leave_year_id": 1,
    "leave_type": "annual",
    "start_date": "2026-03-02",
    "end_date": "2026-03-06",
    "duration": 5,
    "notes": "Family trip",
    "created_at": "2026-02-01T00:00:00Z"
}))]
pub struct Leave {
    pub id: i64,
    pub employee_id: i64,
    #[schema(nullable = true)]
    pub employee_name: Option<String>,
    pub leave_year_id: i64,
    #[schema(example = "annual", value_type = String)]
    pub leave_type: String,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Inclusive calendar days.
    pub duration: i32,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ArchivedLeave {
    pub id: i64,
    pub employee_id: i64,
    #[schema(nullable = true)]
    pub employee_name: Option<String>,
    pub leave_year_id: i64,
    #[schema(value_type = String)]
    pub leave_type: String,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub duration: i32,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub archived_at: DateTime<Utc>,
}

/// Number of days covered by an inclusive date range, `None` when the range
/// is inverted.
pub fn leave_duration(start: NaiveDate, end: NaiveDate) -> Option<i32> {
    if start > end {
        return None;
    }
    i32::try_from((end - start).num_days() + 1).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day_leave_is_one_day() {
        assert_eq!(leave_duration(day(2026, 3, 2), day(2026, 3, 2)), Some(1));
    }

    #[test]
    fn duration_is_inclusive() {
        assert_eq!(leave_duration(day(2026, 3, 2), day(2026, 3, 6)), Some(5));
        // leap day included
        assert_eq!(leave_duration(day(2028, 2, 28), day(2028, 3, 1)), Some(3));
    }

    #[test]
    fn inverted_range_has_no_duration() {
        assert_eq!(leave_duration(day(2026, 3, 6), day(2026, 3, 2)), None);
    }

    #[test]
    fn leave_type_round_trips_through_text() {
        assert_eq!("sick".parse::<LeaveType>().unwrap(), LeaveType::Sick);
        assert_eq!(LeaveType::Emergency.as_str(), "emergency");
        assert!("holiday".parse::<LeaveType>().is_err());
        assert!(LeaveType::Annual.counts_against_entitlement());
        assert!(!LeaveType::Unpaid.counts_against_entitlement());
    }
}
