use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::RequireApiKey;
use crate::features::reports::dtos::{
    image_extension, ImageUpload, ReportDataDto, ReportListQuery, ReportResponseDto,
    SubmitReportForm, UpdateReportStatusDto, ALLOWED_IMAGE_TYPES, MAX_IMAGE_SIZE,
};
use crate::features::reports::services::{ReportService, SubmissionService};
use crate::shared::types::{ApiResponse, Meta};

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub report_service: Arc<ReportService>,
    pub submission_service: Arc<SubmissionService>,
}

/// Submit a new report
///
/// Accepts multipart/form-data with:
/// - `report_data_json`: JSON with `description`, `latitude`, `longitude` (required)
/// - `images`: image files, repeat the field for several (optional)
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = SubmitReportForm,
        content_type = "multipart/form-data",
        description = "Report data as JSON plus zero or more images",
    ),
    responses(
        (status = 201, description = "Report submitted and classified", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Invalid report data or attachment"),
        (status = 401, description = "Authentication required"),
        (status = 500, description = "Report could not be saved")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_report(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponseDto>>)> {
    let (data, images) = read_submission(multipart).await?;

    data.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report = state
        .submission_service
        .submit(user.id, data, images)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(report), None, None)),
    ))
}

async fn read_submission(mut multipart: Multipart) -> Result<(ReportDataDto, Vec<ImageUpload>)> {
    let mut report_data: Option<ReportDataDto> = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "report_data_json" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read report_data_json: {}", e))
                })?;
                let parsed = serde_json::from_str::<ReportDataDto>(&text)
                    .map_err(|e| AppError::BadRequest(format!("Invalid JSON format: {}", e)))?;
                report_data = Some(parsed);
            }
            "images" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read image bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;

                // Browsers send an empty part when no file was chosen
                if data.is_empty() {
                    debug!("Ignoring empty image field {:?}", file_name);
                    continue;
                }

                if data.len() > MAX_IMAGE_SIZE {
                    return Err(AppError::BadRequest(format!(
                        "Image too large. Maximum size is {} MB",
                        MAX_IMAGE_SIZE / 1024 / 1024
                    )));
                }

                let extension = image_extension(&content_type).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "File type '{}' is not allowed. Allowed types: {}",
                        content_type,
                        ALLOWED_IMAGE_TYPES.join(", ")
                    ))
                })?;

                images.push(ImageUpload {
                    data: data.to_vec(),
                    content_type,
                    extension,
                });
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let report_data = report_data
        .ok_or_else(|| AppError::BadRequest("report_data_json is required".to_string()))?;

    Ok((report_data, images))
}

/// List reports submitted by the authenticated user
#[utoipa::path(
    get,
    path = "/api/reports",
    responses(
        (status = 200, description = "List of user's reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_my_reports(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let reports = state.report_service.list_by_user(user.id).await?;
    Ok(Json(ApiResponse::success(Some(reports), None, None)))
}

/// List all reports with filtering, location search and pagination
#[utoipa::path(
    get,
    path = "/api/reports/all",
    params(ReportListQuery),
    responses(
        (status = 200, description = "Filtered page of reports; meta.total counts all matches", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "reports"
)]
pub async fn list_all_reports(
    State(state): State<ReportState>,
    AppQuery(query): AppQuery<ReportListQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let page = state.report_service.list_filtered(&query).await?;

    Ok(Json(ApiResponse::success(
        Some(page.reports),
        None,
        Some(Meta { total: page.total }),
    )))
}

/// Update a report's status
#[utoipa::path(
    put,
    path = "/api/reports/{id}/status",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Missing API key"),
        (status = 403, description = "Invalid API key"),
        (status = 404, description = "Report not found")
    ),
    security(("api_key" = [])),
    tag = "reports"
)]
pub async fn update_report_status(
    _: RequireApiKey,
    State(state): State<ReportState>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.report_service.update_status(id, dto.status).await?;
    Ok(Json(ApiResponse::success(
        Some(report),
        Some("Report status updated".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::departments::services::MockDepartmentResolver;
    use crate::features::reports::models::{Report, ReportStatus};
    use crate::features::reports::routes;
    use crate::features::reports::services::MockReportRepository;
    use crate::modules::classifier::{ClassificationOutcome, MockClassifier};
    use crate::modules::storage::{MockImageStorage, StoredObject};
    use crate::shared::test_helpers::{with_admin_key, with_authenticated_user, TEST_API_KEY};
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use chrono::Utc;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn report(id: i64, category: &str) -> Report {
        Report {
            id,
            description: "Streetlight broken for days".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            category: Some(category.to_string()),
            status: ReportStatus::Pending,
            department_id: None,
            user_id: Some(42),
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn state(
        reports: MockReportRepository,
        storage: MockImageStorage,
        classifier: MockClassifier,
    ) -> ReportState {
        let reports = Arc::new(reports);
        ReportState {
            report_service: Arc::new(ReportService::new(reports.clone())),
            submission_service: Arc::new(SubmissionService::new(
                reports,
                Arc::new(storage),
                Arc::new(classifier),
                Arc::new(MockDepartmentResolver::new()),
            )),
        }
    }

    fn submit_server(
        reports: MockReportRepository,
        storage: MockImageStorage,
        classifier: MockClassifier,
    ) -> TestServer {
        let app = with_authenticated_user(routes::protected_routes(state(
            reports, storage, classifier,
        )));
        TestServer::new(app).unwrap()
    }

    fn report_json() -> String {
        json!({
            "description": "Streetlight broken for days",
            "latitude": 1.0,
            "longitude": 2.0
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_submit_with_image() {
        let mut reports = MockReportRepository::new();
        reports
            .expect_insert()
            .withf(|r| r.user_id == Some(42))
            .returning(|_| Ok(Some(report(1, "Classification Pending"))));
        reports.expect_add_image().returning(|_, _| Ok(()));
        reports
            .expect_set_classification()
            .returning(|id, c, _| Ok(Some(report(id, c))));

        let mut storage = MockImageStorage::new();
        storage
            .expect_upload_report_image()
            .withf(|id, data, ct, ext| {
                *id == 1 && data.as_slice() == b"png-bytes" && ct == "image/png" && ext == "png"
            })
            .returning(|_, _, _, _| {
                Ok(StoredObject {
                    key: "public/reports/1_x.png".to_string(),
                    url: "http://minio/report-images/public/reports/1_x.png".to_string(),
                })
            });

        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify()
            .returning(|_, _| ClassificationOutcome::Unavailable("offline".into()));

        let form = MultipartForm::new()
            .add_text("report_data_json", report_json())
            .add_part(
                "images",
                Part::bytes(b"png-bytes".to_vec())
                    .file_name("photo.png")
                    .mime_type("image/png"),
            );

        let response = submit_server(reports, storage, classifier)
            .post("/api/reports")
            .multipart(form)
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["category"], "Classification Pending");
        assert_eq!(
            body["data"]["image_urls"][0],
            "http://minio/report-images/public/reports/1_x.png"
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_non_image_before_insert() {
        let mut reports = MockReportRepository::new();
        reports.expect_insert().never();

        let form = MultipartForm::new()
            .add_text("report_data_json", report_json())
            .add_part(
                "images",
                Part::bytes(b"%PDF".to_vec())
                    .file_name("doc.pdf")
                    .mime_type("application/pdf"),
            );

        let response = submit_server(reports, MockImageStorage::new(), MockClassifier::new())
            .post("/api/reports")
            .multipart(form)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_json_and_short_description() {
        let mut reports = MockReportRepository::new();
        reports.expect_insert().never();
        let server = submit_server(reports, MockImageStorage::new(), MockClassifier::new());

        let bad_json = MultipartForm::new().add_text("report_data_json", "{not json");
        server
            .post("/api/reports")
            .multipart(bad_json)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let short = MultipartForm::new().add_text(
            "report_data_json",
            json!({"description": "short", "latitude": 0.0, "longitude": 0.0}).to_string(),
        );
        server
            .post("/api/reports")
            .multipart(short)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let out_of_range = MultipartForm::new().add_text(
            "report_data_json",
            json!({"description": "long enough text", "latitude": 91.0, "longitude": 0.0})
                .to_string(),
        );
        server
            .post("/api/reports")
            .multipart(out_of_range)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let missing = MultipartForm::new().add_text("other", "x");
        server
            .post("/api/reports")
            .multipart(missing)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_all_sets_meta_total() {
        let mut reports = MockReportRepository::new();
        reports
            .expect_count_filtered()
            .withf(|f| f.category.as_deref() == Some("Pothole"))
            .returning(|_| Ok(2));
        reports
            .expect_list_page()
            .withf(|_, skip, limit| *skip == 0 && *limit == 1)
            .returning(|_, _, _| Ok(vec![report(1, "Pothole")]));
        reports
            .expect_image_urls()
            .returning(|_| Ok(HashMap::new()));

        let app = routes::public_routes(state(
            reports,
            MockImageStorage::new(),
            MockClassifier::new(),
        ));
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/reports/all")
            .add_query_param("limit", 1)
            .add_query_param("category", "Pothole")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_rejects_bad_limit() {
        let app = routes::public_routes(state(
            MockReportRepository::new(),
            MockImageStorage::new(),
            MockClassifier::new(),
        ));
        let server = TestServer::new(app).unwrap();

        server
            .get("/api/reports/all")
            .add_query_param("limit", 0)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/reports/all")
            .add_query_param("status", "closed")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_all_rejects_non_finite_location() {
        let app = routes::public_routes(state(
            MockReportRepository::new(),
            MockImageStorage::new(),
            MockClassifier::new(),
        ));
        let server = TestServer::new(app).unwrap();

        server
            .get("/api/reports/all")
            .add_query_param("center_lat", 0)
            .add_query_param("center_lon", 0)
            .add_query_param("radius_km", "NaN")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/reports/all")
            .add_query_param("center_lat", "NaN")
            .add_query_param("center_lon", 0)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/reports/all")
            .add_query_param("center_lat", 0)
            .add_query_param("center_lon", "inf")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_status_requires_api_key() {
        let mut reports = MockReportRepository::new();
        reports
            .expect_update_status()
            .times(1)
            .returning(|id, status| {
                let mut r = report(id, "Pothole");
                r.status = status;
                Ok(Some(r))
            });
        reports
            .expect_image_urls()
            .returning(|_| Ok(HashMap::new()));

        let app = with_admin_key(routes::public_routes(state(
            reports,
            MockImageStorage::new(),
            MockClassifier::new(),
        )));
        let server = TestServer::new(app).unwrap();

        server
            .put("/api/reports/7/status")
            .json(&json!({"status": "in_progress"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .put("/api/reports/7/status")
            .add_header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_static(TEST_API_KEY),
            )
            .json(&json!({"status": "in_progress"}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["status"], "in_progress");
        assert_eq!(body["data"]["id"], 7);
    }
}
