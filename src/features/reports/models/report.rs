use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pending => write!(f, "pending"),
            ReportStatus::InProgress => write!(f, "in_progress"),
            ReportStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Database model for a citizen report
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Report {
    pub id: i64,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub status: ReportStatus,
    pub department_id: Option<i64>,
    pub user_id: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for the initial insert of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let parsed: ReportStatus = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(parsed, ReportStatus::Resolved);
        assert!(serde_json::from_str::<ReportStatus>("\"closed\"").is_err());
        assert_eq!(ReportStatus::Pending.to_string(), "pending");
    }
}
