use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::reports::models::ReportStatus;

/// Report counts overall, per category and per status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsDto {
    pub total_reports: i64,
    #[schema(example = json!({"Pothole": 12, "Graffiti": 3}))]
    pub reports_by_category: BTreeMap<String, i64>,
    #[schema(example = json!({"pending": 9, "resolved": 6}))]
    pub reports_by_status: BTreeMap<String, i64>,
}

impl AnalyticsDto {
    /// Builds the summary from grouped counts. Rows without a category are
    /// left out of the category breakdown but still count toward the total.
    pub fn from_counts(
        by_category: Vec<(Option<String>, i64)>,
        by_status: Vec<(ReportStatus, i64)>,
    ) -> Self {
        let total_reports = by_status.iter().map(|(_, count)| count).sum();

        let reports_by_category = by_category
            .into_iter()
            .filter_map(|(category, count)| category.map(|c| (c, count)))
            .collect();

        let reports_by_status = by_status
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect();

        Self {
            total_reports,
            reports_by_category,
            reports_by_status,
        }
    }
}
