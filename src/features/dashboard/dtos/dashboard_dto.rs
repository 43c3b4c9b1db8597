use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::reports::models::ReportStatus;

const SECONDS_PER_DAY: f64 = 86_400.0;

// ============================================================================
// Response DTOs
// ============================================================================

/// Admin dashboard payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub kpis: KpiDto,
    pub recent_reports: Vec<RecentReportDto>,
    pub department_performance: Vec<DepartmentPerformanceDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KpiDto {
    pub total_reports: i64,
    pub reports_resolved: i64,
    /// Mean time from submission to resolution, e.g. "3.2 days", or "N/A"
    #[schema(example = "3.2 days")]
    pub avg_resolution_time: String,
    pub active_departments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentReportDto {
    pub id: String,
    pub issue: String,
    pub status: ReportStatus,
    #[schema(example = "2 hours ago")]
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentPerformanceDto {
    pub name: String,
    pub resolved: i64,
    pub total: i64,
    /// Resolved share in percent, one decimal
    pub rate: f64,
}

impl DepartmentPerformanceDto {
    pub fn new(name: String, resolved: i64, total: i64) -> Self {
        Self {
            rate: resolution_rate(resolved, total),
            name,
            resolved,
            total,
        }
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Formats an average resolution duration given in seconds
pub fn format_resolution_time(avg_seconds: Option<f64>) -> String {
    match avg_seconds {
        Some(secs) if secs.is_finite() && secs >= 0.0 => {
            format!("{:.1} days", secs / SECONDS_PER_DAY)
        }
        _ => "N/A".to_string(),
    }
}

/// Coarse relative time: whole days, else whole hours past the first hour,
/// else whole minutes
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - created_at;
    let days = elapsed.num_days();
    let seconds = elapsed.num_seconds().max(0);

    if days > 0 {
        format!("{} days ago", days)
    } else if seconds > 3600 {
        format!("{} hours ago", seconds / 3600)
    } else {
        format!("{} minutes ago", seconds / 60)
    }
}

/// Percentage of resolved reports rounded to one decimal; 0 when there are none
pub fn resolution_rate(resolved: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let rate = resolved as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}
