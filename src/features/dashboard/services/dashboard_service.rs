use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::core::error::{AppError, Result};
use crate::features::dashboard::dtos::*;
use crate::features::reports::models::ReportStatus;
use crate::shared::constants::DASHBOARD_RECENT_LIMIT;

#[derive(Debug, FromRow)]
struct KpiRow {
    total_reports: i64,
    reports_resolved: i64,
    avg_resolution_secs: Option<f64>,
}

#[derive(Debug, FromRow)]
struct RecentRow {
    id: i64,
    description: String,
    status: ReportStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PerformanceRow {
    name: String,
    resolved: i64,
    total: i64,
}

/// Service for the admin dashboard summary
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_dashboard(&self) -> Result<DashboardDto> {
        let now = Utc::now();

        let kpis = self.get_kpis().await?;
        let recent_reports = self
            .get_recent()
            .await?
            .into_iter()
            .map(|row| RecentReportDto {
                id: row.id.to_string(),
                issue: row.description,
                status: row.status,
                time: time_ago(row.created_at, now),
            })
            .collect();
        let department_performance = self.get_department_performance().await?;

        Ok(DashboardDto {
            kpis,
            recent_reports,
            department_performance,
        })
    }

    async fn get_kpis(&self) -> Result<KpiDto> {
        let row = sqlx::query_as::<_, KpiRow>(
            r#"
            SELECT
                COUNT(*) AS total_reports,
                COUNT(*) FILTER (WHERE status = 'resolved') AS reports_resolved,
                (AVG(EXTRACT(EPOCH FROM (resolved_at - created_at)))
                    FILTER (WHERE status = 'resolved' AND resolved_at IS NOT NULL))::FLOAT8
                    AS avg_resolution_secs
            FROM reports
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get dashboard KPIs: {:?}", e);
            AppError::Database(e)
        })?;

        let active_departments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments")
            .fetch_one(&self.pool)
            .await?;

        Ok(KpiDto {
            total_reports: row.total_reports,
            reports_resolved: row.reports_resolved,
            avg_resolution_time: format_resolution_time(row.avg_resolution_secs),
            active_departments,
        })
    }

    async fn get_recent(&self) -> Result<Vec<RecentRow>> {
        sqlx::query_as::<_, RecentRow>(
            r#"
            SELECT id, description, status, created_at
            FROM reports
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(DASHBOARD_RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch recent reports: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn get_department_performance(&self) -> Result<Vec<DepartmentPerformanceDto>> {
        let rows = sqlx::query_as::<_, PerformanceRow>(
            r#"
            SELECT
                d.name,
                COUNT(r.id) FILTER (WHERE r.status = 'resolved') AS resolved,
                COUNT(r.id) AS total
            FROM departments d
            LEFT JOIN reports r ON r.department_id = d.id
            GROUP BY d.id, d.name
            ORDER BY d.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get department performance: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows
            .into_iter()
            .map(|row| DepartmentPerformanceDto::new(row.name, row.resolved, row.total))
            .collect())
    }
}
