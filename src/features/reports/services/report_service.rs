use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{ReportListQuery, ReportResponseDto};
use crate::features::reports::models::{Report, ReportStatus};
use super::location_filter::{GeoPoint, RadiusFilter};
use super::report_repository::{ReportFilter, ReportRepository};

/// One page of a filtered listing plus the match count before paging
#[derive(Debug)]
pub struct ReportPage {
    pub reports: Vec<ReportResponseDto>,
    pub total: i64,
}

/// Read and status operations on reports
pub struct ReportService {
    repository: Arc<dyn ReportRepository>,
}

impl ReportService {
    pub fn new(repository: Arc<dyn ReportRepository>) -> Self {
        Self { repository }
    }

    /// Reports submitted by `user_id`, newest first, with their images
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<ReportResponseDto>> {
        let reports = self.repository.list_by_user(user_id).await?;
        let annotated = reports.into_iter().map(|r| (r, None)).collect();
        self.attach_images(annotated).await
    }

    /// Filtered listing: attribute filters, then the optional radius filter,
    /// then `skip`/`limit`. Images are fetched for the returned page only.
    ///
    /// Without a center the page and count come straight from SQL. With one,
    /// the bounding-box candidates are loaded and the exact distance check
    /// runs before paging.
    pub async fn list_filtered(&self, query: &ReportListQuery) -> Result<ReportPage> {
        let mut filter = ReportFilter {
            status: query.status,
            category: query.category.clone(),
            department_id: query.department_id,
            bounding_box: None,
        };
        let skip = query.skip.max(0);
        let limit = query.limit();

        let Some((lat, lon)) = query.center() else {
            let total = self.repository.count_filtered(&filter).await?;
            let reports = self.repository.list_page(&filter, skip, limit).await?;
            let page = reports.into_iter().map(|r| (r, None)).collect();
            return Ok(ReportPage {
                reports: self.attach_images(page).await?,
                total,
            });
        };

        let radius = RadiusFilter::new(GeoPoint::new(lat, lon), query.radius_km);
        filter.bounding_box = Some(radius.bounding_box());

        let candidates = self.repository.list_filtered(&filter).await?;
        let matched = radius.apply(candidates, |r| GeoPoint::new(r.latitude, r.longitude));

        let total = matched.len() as i64;
        let page: Vec<(Report, Option<f64>)> = matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|(r, d)| (r, Some(d)))
            .collect();

        Ok(ReportPage {
            reports: self.attach_images(page).await?,
            total,
        })
    }

    /// Set a report's status; 404 when the report does not exist
    pub async fn update_status(
        &self,
        report_id: i64,
        status: ReportStatus,
    ) -> Result<ReportResponseDto> {
        let report = self
            .repository
            .update_status(report_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report with ID {} not found", report_id)))?;

        tracing::info!("Report {} status changed to {}", report_id, status);

        let mut reports = self.attach_images(vec![(report, None)]).await?;
        reports
            .pop()
            .ok_or_else(|| AppError::Internal("Updated report went missing".to_string()))
    }

    async fn attach_images(
        &self,
        reports: Vec<(Report, Option<f64>)>,
    ) -> Result<Vec<ReportResponseDto>> {
        let ids: Vec<i64> = reports.iter().map(|(r, _)| r.id).collect();
        let mut images = self.repository.image_urls(&ids).await?;

        Ok(reports
            .into_iter()
            .map(|(report, distance_km)| {
                let urls = images.remove(&report.id).unwrap_or_default();
                let mut dto = ReportResponseDto::from_report(report, urls);
                dto.distance_km = distance_km;
                dto
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::services::MockReportRepository;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;

    fn report(id: i64, lat: f64, lon: f64) -> Report {
        let created_at = Utc::now() - Duration::minutes(id);
        Report {
            id,
            description: format!("Report number {}", id),
            latitude: lat,
            longitude: lon,
            category: Some("Pothole".to_string()),
            status: ReportStatus::Pending,
            department_id: None,
            user_id: Some(1),
            resolved_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_location_filter_runs_before_pagination() {
        let mut repo = MockReportRepository::new();
        repo.expect_list_filtered()
            .withf(|f| f.bounding_box.is_some() && f.status.is_none())
            .returning(|_| {
                Ok(vec![
                    report(1, 0.0, 0.0),
                    report(2, 10.0, 10.0),
                    report(3, 0.01, 0.01),
                    report(4, 0.02, 0.0),
                ])
            });
        repo.expect_image_urls()
            .withf(|ids| ids == [3, 4])
            .returning(|_| Ok(HashMap::from([(3, vec!["http://img/3.jpg".to_string()])])));

        let service = ReportService::new(Arc::new(repo));
        let page = service
            .list_filtered(&ReportListQuery {
                center_lat: Some(0.0),
                center_lon: Some(0.0),
                skip: 1,
                limit: 2,
                ..ReportListQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<i64> = page.reports.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(page.reports[0].image_urls, vec!["http://img/3.jpg"]);
        assert!(page.reports[1].image_urls.is_empty());
        assert_eq!(page.reports[0].distance_km, Some(1.57));
    }

    #[tokio::test]
    async fn test_listing_without_center_pages_in_sql() {
        let mut repo = MockReportRepository::new();
        repo.expect_count_filtered()
            .withf(|f| f.bounding_box.is_none() && f.department_id == Some(3))
            .times(1)
            .returning(|_| Ok(42));
        repo.expect_list_page()
            .withf(|f, skip, limit| f.bounding_box.is_none() && *skip == 20 && *limit == 2)
            .times(1)
            .returning(|_, _, _| Ok(vec![report(21, 0.0, 0.0), report(22, 50.0, 50.0)]));
        repo.expect_list_filtered().never();
        repo.expect_image_urls()
            .withf(|ids| ids == [21, 22])
            .returning(|_| Ok(HashMap::new()));

        let service = ReportService::new(Arc::new(repo));
        let page = service
            .list_filtered(&ReportListQuery {
                department_id: Some(3),
                center_lat: Some(0.0),
                skip: 20,
                limit: 2,
                ..ReportListQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 42);
        assert_eq!(page.reports.len(), 2);
        assert!(page.reports.iter().all(|r| r.distance_km.is_none()));
    }

    #[tokio::test]
    async fn test_radius_listing_does_not_page_in_sql() {
        let mut repo = MockReportRepository::new();
        repo.expect_list_filtered()
            .times(1)
            .returning(|_| Ok(vec![report(1, 0.0, 0.0)]));
        repo.expect_count_filtered().never();
        repo.expect_list_page().never();
        repo.expect_image_urls()
            .withf(|ids| ids.is_empty())
            .returning(|_| Ok(HashMap::new()));

        let service = ReportService::new(Arc::new(repo));
        let page = service
            .list_filtered(&ReportListQuery {
                center_lat: Some(0.0),
                center_lon: Some(0.0),
                skip: 5,
                ..ReportListQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert!(page.reports.is_empty());
    }

    #[tokio::test]
    async fn test_negative_skip_is_clamped() {
        let mut repo = MockReportRepository::new();
        repo.expect_count_filtered().returning(|_| Ok(0));
        repo.expect_list_page()
            .withf(|_, skip, _| *skip == 0)
            .returning(|_, _, _| Ok(vec![]));
        repo.expect_image_urls().returning(|_| Ok(HashMap::new()));

        let service = ReportService::new(Arc::new(repo));
        let page = service
            .list_filtered(&ReportListQuery {
                skip: -3,
                ..ReportListQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert!(page.reports.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_missing_report_is_not_found() {
        let mut repo = MockReportRepository::new();
        repo.expect_update_status().returning(|_, _| Ok(None));

        let service = ReportService::new(Arc::new(repo));
        let err = service
            .update_status(99, ReportStatus::Resolved)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status_returns_images() {
        let mut repo = MockReportRepository::new();
        repo.expect_update_status()
            .withf(|id, status| *id == 5 && *status == ReportStatus::Resolved)
            .returning(|id, status| {
                let mut r = report(id, 1.0, 1.0);
                r.status = status;
                r.resolved_at = Some(Utc::now());
                Ok(Some(r))
            });
        repo.expect_image_urls()
            .returning(|_| Ok(HashMap::from([(5, vec!["http://img/a.png".to_string()])])));

        let service = ReportService::new(Arc::new(repo));
        let dto = service.update_status(5, ReportStatus::Resolved).await.unwrap();

        assert_eq!(dto.status, ReportStatus::Resolved);
        assert!(dto.resolved_at.is_some());
        assert_eq!(dto.image_urls, vec!["http://img/a.png"]);
    }
}
