use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{NewReport, Report, ReportStatus};
use super::location_filter::BoundingBox;

const REPORT_COLUMNS: &str = "id, description, latitude, longitude, category, status, \
     department_id, user_id, resolved_at, created_at, updated_at";

/// Attribute filters for the admin listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<String>,
    pub department_id: Option<i64>,
    pub bounding_box: Option<BoundingBox>,
}

/// Persistence port for reports and their images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert the initial row; `None` when the database returned no row
    async fn insert(&self, report: NewReport) -> Result<Option<Report>>;

    /// Record an uploaded image URL for a report
    async fn add_image(&self, report_id: i64, image_url: &str) -> Result<()>;

    /// Write the classification result; `None` when the row is gone
    async fn set_classification(
        &self,
        report_id: i64,
        category: &str,
        department_id: Option<i64>,
    ) -> Result<Option<Report>>;

    /// Delete a report and (by cascade) its image rows
    async fn delete(&self, report_id: i64) -> Result<()>;

    /// Image URLs per report, in insertion order
    async fn image_urls(&self, report_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>>;

    /// A user's reports, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Report>>;

    /// Every report matching `filter`, newest first
    async fn list_filtered(&self, filter: &ReportFilter) -> Result<Vec<Report>>;

    /// Number of reports matching `filter`
    async fn count_filtered(&self, filter: &ReportFilter) -> Result<i64>;

    /// One page of the reports matching `filter`, newest first
    async fn list_page(&self, filter: &ReportFilter, skip: i64, limit: i64) -> Result<Vec<Report>>;

    /// Change status and maintain `resolved_at`; `None` when not found
    async fn update_status(&self, report_id: i64, status: ReportStatus) -> Result<Option<Report>>;
}

pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the WHERE clause for `filter` to a `SELECT ... FROM reports` query
fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ReportFilter) {
    qb.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(department_id) = filter.department_id {
        qb.push(" AND department_id = ").push_bind(department_id);
    }
    if let Some(bbox) = &filter.bounding_box {
        qb.push(" AND latitude BETWEEN ")
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat);
        if let Some((min_lon, max_lon)) = bbox.lon {
            qb.push(" AND longitude BETWEEN ")
                .push_bind(min_lon)
                .push(" AND ")
                .push_bind(max_lon);
        }
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, skip: i64, limit: i64) {
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn insert(&self, report: NewReport) -> Result<Option<Report>> {
        let sql = format!(
            "INSERT INTO reports (description, latitude, longitude, category, status, user_id) \
             VALUES ($1, $2, $3, $4, 'pending', $5) \
             RETURNING {}",
            REPORT_COLUMNS
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(&report.description)
            .bind(report.latitude)
            .bind(report.longitude)
            .bind(&report.category)
            .bind(report.user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert report: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn add_image(&self, report_id: i64, image_url: &str) -> Result<()> {
        sqlx::query("INSERT INTO report_images (report_id, image_url) VALUES ($1, $2)")
            .bind(report_id)
            .bind(image_url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to record image for report {}: {:?}", report_id, e);
                AppError::Database(e)
            })?;
        Ok(())
    }

    async fn set_classification(
        &self,
        report_id: i64,
        category: &str,
        department_id: Option<i64>,
    ) -> Result<Option<Report>> {
        let sql = format!(
            "UPDATE reports SET category = $2, department_id = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            REPORT_COLUMNS
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(report_id)
            .bind(category)
            .bind(department_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to classify report {}: {:?}", report_id, e);
                AppError::Database(e)
            })
    }

    async fn delete(&self, report_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete report {}: {:?}", report_id, e);
                AppError::Database(e)
            })?;
        Ok(())
    }

    async fn image_urls(&self, report_ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        if report_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT report_id, image_url FROM report_images \
             WHERE report_id = ANY($1) \
             ORDER BY id",
        )
        .bind(report_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch report images: {:?}", e);
            AppError::Database(e)
        })?;

        let mut images: HashMap<i64, Vec<String>> = HashMap::new();
        for (report_id, url) in rows {
            images.entry(report_id).or_default().push(url);
        }
        Ok(images)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Report>> {
        let sql = format!(
            "SELECT {} FROM reports WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            REPORT_COLUMNS
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list reports for user {}: {:?}", user_id, e);
                AppError::Database(e)
            })
    }

    async fn list_filtered(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM reports", REPORT_COLUMNS));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");

        qb.build_query_as::<Report>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list filtered reports: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn count_filtered(&self, filter: &ReportFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reports");
        push_filter(&mut qb, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count filtered reports: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn list_page(&self, filter: &ReportFilter, skip: i64, limit: i64) -> Result<Vec<Report>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM reports", REPORT_COLUMNS));
        push_filter(&mut qb, filter);
        push_page(&mut qb, skip, limit);

        qb.build_query_as::<Report>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list report page: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn update_status(&self, report_id: i64, status: ReportStatus) -> Result<Option<Report>> {
        let sql = format!(
            "UPDATE reports SET status = $2, \
                 resolved_at = CASE \
                     WHEN $2 = 'resolved'::report_status THEN COALESCE(resolved_at, NOW()) \
                     ELSE NULL \
                 END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            REPORT_COLUMNS
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(report_id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update status of report {}: {:?}", report_id, e);
                AppError::Database(e)
            })
    }
}
