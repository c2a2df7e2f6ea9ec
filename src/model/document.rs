use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Row of `document_tracker`: one per employee.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DocumentRecord {
    pub id: i64,
    pub employee_id: i64,
    #[schema(nullable = true)]
    pub employee_name: Option<String>,
    #[schema(nullable = true)]
    pub branch_id: Option<i64>,
    #[schema(format = "date", value_type = Option<String>)]
    pub passport_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub visa_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub id_card_expiry: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub contract_expiry: Option<NaiveDate>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    Visa,
    IdCard,
    Contract,
}

/// Ordered by severity, so the overall status is the max of the parts.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, ToSchema,
    Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    Missing,
    Valid,
    ExpiringSoon,
    Expired,
}

impl DocumentStatus {
    pub fn of(expiry: Option<NaiveDate>, today: NaiveDate, warning_days: i64) -> Self {
        match expiry {
            None => DocumentStatus::Missing,
            Some(date) if date < today => DocumentStatus::Expired,
            Some(date) if (date - today).num_days() <= warning_days => {
                DocumentStatus::ExpiringSoon
            }
            Some(_) => DocumentStatus::Valid,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocumentEntry {
    pub kind: DocumentKind,
    #[schema(format = "date", value_type = Option<String>)]
    pub expiry: Option<NaiveDate>,
    pub status: DocumentStatus,
    /// Negative once expired.
    #[schema(nullable = true)]
    pub days_left: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocumentView {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub status: DocumentStatus,
    pub documents: Vec<DocumentEntry>,
}

impl DocumentRecord {
    pub fn expiries(&self) -> [(DocumentKind, Option<NaiveDate>); 4] {
        [
            (DocumentKind::Passport, self.passport_expiry),
            (DocumentKind::Visa, self.visa_expiry),
            (DocumentKind::IdCard, self.id_card_expiry),
            (DocumentKind::Contract, self.contract_expiry),
        ]
    }

    /// Overall status: `missing` when nothing is recorded, otherwise the most
    /// severe status among the recorded documents.
    pub fn into_view(self, today: NaiveDate, warning_days: i64) -> DocumentView {
        let documents: Vec<DocumentEntry> = self
            .expiries()
            .into_iter()
            .map(|(kind, expiry)| DocumentEntry {
                kind,
                expiry,
                status: DocumentStatus::of(expiry, today, warning_days),
                days_left: expiry.map(|date| (date - today).num_days()),
            })
            .collect();

        let status = documents
            .iter()
            .filter(|d| d.status != DocumentStatus::Missing)
            .map(|d| d.status)
            .max()
            .unwrap_or(DocumentStatus::Missing);

        DocumentView {
            record: self,
            status,
            documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn record() -> DocumentRecord {
        DocumentRecord {
            id: 1,
            employee_id: 7,
            employee_name: Some("Jane".into()),
            branch_id: Some(1),
            passport_expiry: None,
            visa_expiry: None,
            id_card_expiry: None,
            contract_expiry: None,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_thresholds() {
        let today = day(6, 1);
        assert_eq!(DocumentStatus::of(None, today, 30), DocumentStatus::Missing);
        assert_eq!(DocumentStatus::of(Some(day(5, 31)), today, 30), DocumentStatus::Expired);
        assert_eq!(DocumentStatus::of(Some(today), today, 30), DocumentStatus::ExpiringSoon);
        assert_eq!(DocumentStatus::of(Some(day(7, 1)), today, 30), DocumentStatus::ExpiringSoon);
        assert_eq!(DocumentStatus::of(Some(day(7, 2)), today, 30), DocumentStatus::Valid);
    }

    #[test]
    fn empty_record_is_missing() {
        let view = record().into_view(day(6, 1), 30);
        assert_eq!(view.status, DocumentStatus::Missing);
        assert!(view.documents.iter().all(|d| d.days_left.is_none()));
    }

    #[test]
    fn overall_status_is_most_severe() {
        let mut rec = record();
        rec.passport_expiry = Some(day(12, 1));
        rec.visa_expiry = Some(day(6, 10));
        let view = rec.clone().into_view(day(6, 1), 30);
        assert_eq!(view.status, DocumentStatus::ExpiringSoon);

        rec.contract_expiry = Some(day(1, 1));
        let view = rec.into_view(day(6, 1), 30);
        assert_eq!(view.status, DocumentStatus::Expired);
        let contract = view
            .documents
            .iter()
            .find(|d| d.kind == DocumentKind::Contract)
            .unwrap();
        assert_eq!(contract.days_left, Some(-151));
    }

    #[test]
    fn recorded_valid_document_beats_missing_ones() {
        let mut rec = record();
        rec.id_card_expiry = Some(day(12, 31));
        assert_eq!(rec.into_view(day(6, 1), 30).status, DocumentStatus::Valid);
    }
}
