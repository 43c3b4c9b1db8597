use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::departments::services::DepartmentResolver;
use crate::features::reports::dtos::{ImageUpload, ReportDataDto, ReportResponseDto};
use crate::features::reports::models::{NewReport, Report};
use crate::modules::classifier::{ClassificationOutcome, Classifier};
use crate::modules::storage::{ImageStorage, StoredObject};
use crate::shared::constants::CLASSIFICATION_PENDING;
use super::report_repository::ReportRepository;

/// Runs the submission pipeline: insert, upload, classify, route, finalize.
///
/// Only the initial insert and the final update are fatal. Upload,
/// classification and routing failures degrade the result instead. When the
/// final update fails, uploaded objects and the row are removed before the
/// error is returned.
pub struct SubmissionService {
    reports: Arc<dyn ReportRepository>,
    storage: Arc<dyn ImageStorage>,
    classifier: Arc<dyn Classifier>,
    departments: Arc<dyn DepartmentResolver>,
}

impl SubmissionService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        storage: Arc<dyn ImageStorage>,
        classifier: Arc<dyn Classifier>,
        departments: Arc<dyn DepartmentResolver>,
    ) -> Self {
        Self {
            reports,
            storage,
            classifier,
            departments,
        }
    }

    pub async fn submit(
        &self,
        user_id: i64,
        data: ReportDataDto,
        images: Vec<ImageUpload>,
    ) -> Result<ReportResponseDto> {
        let report = self
            .reports
            .insert(NewReport {
                description: data.description,
                latitude: data.latitude,
                longitude: data.longitude,
                category: CLASSIFICATION_PENDING.to_string(),
                user_id: Some(user_id),
            })
            .await?
            .ok_or_else(|| AppError::Internal("Failed to save initial report".to_string()))?;

        tracing::info!("Created report {} for user {}", report.id, user_id);

        let uploaded = self.store_images(report.id, images).await;
        let image_urls: Vec<String> = uploaded.iter().map(|o| o.url.clone()).collect();

        let outcome = self
            .classifier
            .classify(&report.description, &image_urls)
            .await;
        let department_id = match &outcome {
            ClassificationOutcome::Classified(category) => self.route(category).await,
            ClassificationOutcome::Unavailable(_) => None,
        };

        let finalized = match self
            .reports
            .set_classification(report.id, outcome.category(), department_id)
            .await
        {
            Ok(Some(finalized)) => finalized,
            Ok(None) => {
                tracing::error!("Report {} vanished before classification was saved", report.id);
                return Err(self.compensate(&report, &uploaded).await);
            }
            Err(e) => {
                tracing::error!("Failed to save classification for report {}: {}", report.id, e);
                return Err(self.compensate(&report, &uploaded).await);
            }
        };

        tracing::info!(
            "Report {} classified as '{}' (department: {:?}, images: {})",
            finalized.id,
            outcome.category(),
            department_id,
            image_urls.len()
        );

        Ok(ReportResponseDto::from_report(finalized, image_urls))
    }

    /// Upload each image in order and record its URL. Images whose upload
    /// or URL record fails are skipped.
    async fn store_images(&self, report_id: i64, images: Vec<ImageUpload>) -> Vec<StoredObject> {
        let mut uploaded = Vec::with_capacity(images.len());

        for (index, image) in images.into_iter().enumerate() {
            let stored = match self
                .storage
                .upload_report_image(report_id, image.data, &image.content_type, image.extension)
                .await
            {
                Ok(stored) => stored,
                Err(e) => {
                    tracing::warn!(
                        "Skipping image {} of report {}: upload failed: {}",
                        index,
                        report_id,
                        e
                    );
                    continue;
                }
            };

            if let Err(e) = self.reports.add_image(report_id, &stored.url).await {
                tracing::warn!(
                    "Skipping image {} of report {}: could not record URL: {}",
                    index,
                    report_id,
                    e
                );
                self.delete_object(&stored).await;
                continue;
            }

            uploaded.push(stored);
        }

        uploaded
    }

    /// Department for a category; lookup failures count as no mapping
    async fn route(&self, category: &str) -> Option<i64> {
        match self.departments.resolve(category).await {
            Ok(Some(department_id)) => Some(department_id),
            Ok(None) => {
                tracing::warn!("No routing rule for category '{}'", category);
                None
            }
            Err(e) => {
                tracing::warn!("Routing lookup for category '{}' failed: {}", category, e);
                None
            }
        }
    }

    /// Undo the side effects of a failed submission, newest first
    async fn compensate(&self, report: &Report, uploaded: &[StoredObject]) -> AppError {
        for object in uploaded.iter().rev() {
            self.delete_object(object).await;
        }

        if let Err(e) = self.reports.delete(report.id).await {
            tracing::error!("Compensation could not delete report {}: {}", report.id, e);
        } else {
            tracing::info!("Rolled back report {}", report.id);
        }

        AppError::Internal("Failed to update report with classification".to_string())
    }

    async fn delete_object(&self, object: &StoredObject) {
        if let Err(e) = self.storage.delete(&object.key).await {
            tracing::warn!("Could not delete stored object '{}': {}", object.key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::departments::services::MockDepartmentResolver;
    use crate::features::reports::models::ReportStatus;
    use crate::features::reports::services::MockReportRepository;
    use crate::modules::classifier::MockClassifier;
    use crate::modules::storage::MockImageStorage;
    use chrono::Utc;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn data() -> ReportDataDto {
        ReportDataDto {
            description: Sentence(4..8).fake::<String>() + " pothole",
            latitude: 12.97,
            longitude: 77.59,
        }
    }

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            data: name.as_bytes().to_vec(),
            content_type: "image/jpeg".to_string(),
            extension: "jpg",
        }
    }

    fn row(id: i64, new: &NewReport) -> Report {
        Report {
            id,
            description: new.description.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
            category: Some(new.category.clone()),
            status: ReportStatus::Pending,
            department_id: None,
            user_id: new.user_id,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn classified(id: i64, category: &str, department_id: Option<i64>) -> Report {
        let mut r = row(
            id,
            &NewReport {
                description: "x".repeat(12),
                latitude: 0.0,
                longitude: 0.0,
                category: category.to_string(),
                user_id: Some(42),
            },
        );
        r.department_id = department_id;
        r
    }

    fn stored(report_id: i64, n: usize) -> StoredObject {
        let key = format!("public/reports/{}_{}.jpg", report_id, n);
        StoredObject {
            url: format!("http://minio/report-images/{}", key),
            key,
        }
    }

    struct Mocks {
        reports: MockReportRepository,
        storage: MockImageStorage,
        classifier: MockClassifier,
        departments: MockDepartmentResolver,
    }

    impl Mocks {
        fn new() -> Self {
            let mut reports = MockReportRepository::new();
            reports
                .expect_insert()
                .withf(|r| r.category == "Classification Pending" && r.user_id == Some(42))
                .returning(|r| Ok(Some(row(1, &r))));

            Self {
                reports,
                storage: MockImageStorage::new(),
                classifier: MockClassifier::new(),
                departments: MockDepartmentResolver::new(),
            }
        }

        fn service(self) -> SubmissionService {
            SubmissionService::new(
                Arc::new(self.reports),
                Arc::new(self.storage),
                Arc::new(self.classifier),
                Arc::new(self.departments),
            )
        }
    }

    #[tokio::test]
    async fn test_unreachable_classifier_leaves_pending_category() {
        let mut m = Mocks::new();
        m.classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Unavailable("connection refused".into()));
        m.departments.expect_resolve().never();
        m.reports
            .expect_set_classification()
            .with(eq(1i64), eq("Classification Pending"), eq(None::<i64>))
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m.service().submit(42, data(), vec![]).await.unwrap();

        assert_eq!(report.category.as_deref(), Some("Classification Pending"));
        assert_eq!(report.department_id, None);
        assert!(report.image_urls.is_empty());
    }

    #[tokio::test]
    async fn test_mapped_category_routes_to_department() {
        let mut m = Mocks::new();
        m.storage
            .expect_upload_report_image()
            .returning(|id, _, _, _| Ok(stored(id, 0)));
        m.reports.expect_add_image().returning(|_, _| Ok(()));
        m.classifier
            .expect_classify()
            .withf(|_, urls| urls.len() == 1)
            .returning(|_, _| ClassificationOutcome::Classified("Pothole".into()));
        m.departments
            .expect_resolve()
            .with(eq("Pothole"))
            .returning(|_| Ok(Some(3)));
        m.reports
            .expect_set_classification()
            .with(eq(1i64), eq("Pothole"), eq(Some(3i64)))
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m
            .service()
            .submit(42, data(), vec![image("a")])
            .await
            .unwrap();

        assert_eq!(report.category.as_deref(), Some("Pothole"));
        assert_eq!(report.department_id, Some(3));
        assert_eq!(report.image_urls, vec![stored(1, 0).url]);
    }

    #[tokio::test]
    async fn test_unmapped_category_has_no_department() {
        let mut m = Mocks::new();
        m.classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Classified("Graffiti".into()));
        m.departments.expect_resolve().returning(|_| Ok(None));
        m.reports
            .expect_set_classification()
            .with(eq(1i64), eq("Graffiti"), eq(None::<i64>))
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m.service().submit(42, data(), vec![]).await.unwrap();
        assert_eq!(report.department_id, None);
    }

    #[tokio::test]
    async fn test_resolver_error_is_treated_as_unmapped() {
        let mut m = Mocks::new();
        m.classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Classified("Pothole".into()));
        m.departments
            .expect_resolve()
            .returning(|_| Err(AppError::Internal("pool timed out".into())));
        m.reports
            .expect_set_classification()
            .with(eq(1i64), eq("Pothole"), eq(None::<i64>))
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m.service().submit(42, data(), vec![]).await.unwrap();
        assert_eq!(report.department_id, None);
    }

    #[tokio::test]
    async fn test_failed_upload_is_skipped() {
        let mut m = Mocks::new();
        let mut seq = Sequence::new();
        m.storage
            .expect_upload_report_image()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Err(AppError::Internal("bucket unavailable".into())));
        m.storage
            .expect_upload_report_image()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, _, _, _| Ok(stored(id, 1)));
        m.reports
            .expect_add_image()
            .times(1)
            .returning(|_, _| Ok(()));
        m.classifier
            .expect_classify()
            .withf(|_, urls| urls == [stored(1, 1).url])
            .returning(|_, _| ClassificationOutcome::Classified("Pothole".into()));
        m.departments.expect_resolve().returning(|_| Ok(Some(3)));
        m.reports
            .expect_set_classification()
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m
            .service()
            .submit(42, data(), vec![image("a"), image("b")])
            .await
            .unwrap();

        assert_eq!(report.image_urls, vec![stored(1, 1).url]);
    }

    #[tokio::test]
    async fn test_unrecorded_image_is_deleted_and_skipped() {
        let mut m = Mocks::new();
        m.storage
            .expect_upload_report_image()
            .returning(|id, _, _, _| Ok(stored(id, 0)));
        m.reports
            .expect_add_image()
            .returning(|_, _| Err(AppError::Internal("insert failed".into())));
        m.storage
            .expect_delete()
            .with(eq("public/reports/1_0.jpg"))
            .times(1)
            .returning(|_| Ok(()));
        m.classifier
            .expect_classify()
            .withf(|_, urls| urls.is_empty())
            .returning(|_, _| ClassificationOutcome::Unavailable("no images".into()));
        m.reports
            .expect_set_classification()
            .returning(|id, c, d| Ok(Some(classified(id, c, d))));

        let report = m
            .service()
            .submit(42, data(), vec![image("a")])
            .await
            .unwrap();
        assert!(report.image_urls.is_empty());
    }

    #[tokio::test]
    async fn test_final_update_failure_rolls_back() {
        let mut m = Mocks::new();
        let mut n = 0;
        m.storage
            .expect_upload_report_image()
            .times(2)
            .returning(move |id, _, _, _| {
                n += 1;
                Ok(stored(id, n))
            });
        m.reports.expect_add_image().returning(|_, _| Ok(()));
        m.classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Classified("Pothole".into()));
        m.departments.expect_resolve().returning(|_| Ok(Some(3)));
        m.reports
            .expect_set_classification()
            .returning(|_, _, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let mut seq = Sequence::new();
        m.storage
            .expect_delete()
            .with(eq("public/reports/1_2.jpg"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        m.storage
            .expect_delete()
            .with(eq("public/reports/1_1.jpg"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        m.reports
            .expect_delete()
            .with(eq(1i64))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let err = m
            .service()
            .submit(42, data(), vec![image("a"), image("b")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_missing_row_on_final_update_rolls_back() {
        let mut m = Mocks::new();
        m.classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Unavailable("timeout".into()));
        m.reports
            .expect_set_classification()
            .returning(|_, _, _| Ok(None));
        m.reports
            .expect_delete()
            .with(eq(1i64))
            .times(1)
            .returning(|_| Ok(()));

        let err = m.service().submit(42, data(), vec![]).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_initial_insert_without_row_fails() {
        let mut reports = MockReportRepository::new();
        reports.expect_insert().returning(|_| Ok(None));
        let mut storage = MockImageStorage::new();
        storage.expect_upload_report_image().never();
        let mut classifier = MockClassifier::new();
        classifier.expect_classify().never();

        let service = SubmissionService::new(
            Arc::new(reports),
            Arc::new(storage),
            Arc::new(classifier),
            Arc::new(MockDepartmentResolver::new()),
        );

        let err = service
            .submit(42, data(), vec![image("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
