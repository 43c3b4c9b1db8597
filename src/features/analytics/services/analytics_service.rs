use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::analytics::dtos::AnalyticsDto;
use crate::features::reports::models::ReportStatus;

pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn summary(&self) -> Result<AnalyticsDto> {
        let by_category = sqlx::query_as::<_, (Option<String>, i64)>(
            "SELECT category, COUNT(*) FROM reports GROUP BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count reports by category: {:?}", e);
            AppError::Database(e)
        })?;

        let by_status = sqlx::query_as::<_, (ReportStatus, i64)>(
            "SELECT status, COUNT(*) FROM reports GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count reports by status: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(AnalyticsDto::from_counts(by_category, by_status))
    }
}
