use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveYear {
    pub id: i64,
    #[schema(example = "2026")]
    pub name: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub is_current: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl LeaveYear {
    /// True when the whole inclusive range lies inside this year.
    pub fn contains_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= start && end <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year_2026() -> LeaveYear {
        LeaveYear {
            id: 1,
            name: "2026".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            is_current: true,
            created_at: Utc::now(),
        }
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn range_on_boundaries_fits() {
        let year = year_2026();
        assert!(year.contains_range(day(1, 1), day(12, 31)));
        assert!(year.contains_range(day(6, 15), day(6, 15)));
    }

    #[test]
    fn range_crossing_year_end_does_not_fit() {
        let year = year_2026();
        let next = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        assert!(!year.contains_range(day(12, 30), next));
        let eve = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert!(!year.contains_range(eve, eve));
    }
}
