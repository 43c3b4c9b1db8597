use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::reports::models::{Report, ReportStatus};
use crate::shared::constants::{DEFAULT_LIMIT, DEFAULT_RADIUS_KM, MAX_LIMIT};
use crate::shared::validation::validate_finite;

/// Maximum size of a single report image in bytes (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Image types accepted as report attachments
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// The JSON document carried in the `report_data_json` form field
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReportDataDto {
    #[validate(length(
        min = 10,
        max = 500,
        message = "Description must be between 10 and 500 characters"
    ))]
    #[schema(example = "Deep pothole in the right lane near the bus stop")]
    pub description: String,

    #[validate(
        custom(function = "validate_finite"),
        range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90")
    )]
    pub latitude: f64,

    #[validate(
        custom(function = "validate_finite"),
        range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180")
    )]
    pub longitude: f64,
}

/// Multipart form for report submission
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SubmitReportForm {
    /// JSON-encoded [`ReportDataDto`]
    #[schema(example = r#"{"description":"Streetlight out for a week","latitude":12.97,"longitude":77.59}"#)]
    pub report_data_json: String,
    /// Zero or more images (repeat the field for each file)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub images: Vec<String>,
}

/// An image attachment read from the submission form
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: i64,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub status: ReportStatus,
    pub department_id: Option<i64>,
    pub user_id: Option<i64>,
    pub image_urls: Vec<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Distance from the search center, present for location-filtered listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ReportResponseDto {
    pub fn from_report(report: Report, image_urls: Vec<String>) -> Self {
        Self {
            id: report.id,
            description: report.description,
            latitude: report.latitude,
            longitude: report.longitude,
            category: report.category,
            status: report.status,
            department_id: report.department_id,
            user_id: report.user_id,
            image_urls,
            resolved_at: report.resolved_at,
            created_at: report.created_at,
            updated_at: report.updated_at,
            distance_km: None,
        }
    }
}

/// Query parameters for the filtered report listing
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportListQuery {
    /// Filter by status
    pub status: Option<ReportStatus>,
    /// Filter by exact category name
    pub category: Option<String>,
    /// Filter by assigned department
    pub department_id: Option<i64>,
    /// Center latitude for location filtering (requires `center_lon`)
    #[validate(
        custom(function = "validate_finite"),
        range(min = -90.0, max = 90.0, message = "center_lat must be between -90 and 90")
    )]
    pub center_lat: Option<f64>,
    /// Center longitude for location filtering (requires `center_lat`)
    #[validate(
        custom(function = "validate_finite"),
        range(min = -180.0, max = 180.0, message = "center_lon must be between -180 and 180")
    )]
    pub center_lon: Option<f64>,
    /// Search radius in kilometers (default: 10)
    #[serde(default = "default_radius_km")]
    #[validate(
        custom(function = "validate_finite"),
        range(exclusive_min = 0.0, message = "radius_km must be greater than 0")
    )]
    #[param(default = 10.0)]
    pub radius_km: f64,
    /// Number of matching reports to skip
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    #[param(minimum = 0, default = 0)]
    pub skip: i64,
    /// Maximum number of reports to return
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, default = 10)]
    pub limit: i64,
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for ReportListQuery {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            department_id: None,
            center_lat: None,
            center_lon: None,
            radius_km: DEFAULT_RADIUS_KM,
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ReportListQuery {
    /// Center point, only when both coordinates are given
    pub fn center(&self) -> Option<(f64, f64)> {
        self.center_lat.zip(self.center_lon)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Request DTO for changing a report's status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateReportStatusDto {
    pub status: ReportStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_data() -> ReportDataDto {
        ReportDataDto {
            description: "Broken streetlight on 5th avenue".to_string(),
            latitude: 12.5,
            longitude: -45.0,
        }
    }

    #[test]
    fn test_report_data_bounds() {
        assert!(valid_data().validate().is_ok());

        let mut short = valid_data();
        short.description = "too short".to_string();
        assert!(short.validate().is_err());

        let mut long = valid_data();
        long.description = "x".repeat(501);
        assert!(long.validate().is_err());

        let mut lat = valid_data();
        lat.latitude = 90.5;
        assert!(lat.validate().is_err());

        let mut lon = valid_data();
        lon.longitude = -180.1;
        assert!(lon.validate().is_err());

        let mut edge = valid_data();
        edge.latitude = -90.0;
        edge.longitude = 180.0;
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_list_query_defaults_and_bounds() {
        let query: ReportListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.radius_km, 10.0);
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, 10);
        assert!(query.validate().is_ok());
        assert!(query.center().is_none());

        let zero_radius = ReportListQuery {
            radius_km: 0.0,
            ..ReportListQuery::default()
        };
        assert!(zero_radius.validate().is_err());

        let big_limit = ReportListQuery {
            limit: 101,
            ..ReportListQuery::default()
        };
        assert!(big_limit.validate().is_err());

        let negative_skip = ReportListQuery {
            skip: -1,
            ..ReportListQuery::default()
        };
        assert!(negative_skip.validate().is_err());
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let mut nan_lat = valid_data();
        nan_lat.latitude = f64::NAN;
        assert!(nan_lat.validate().is_err());

        let mut inf_lon = valid_data();
        inf_lon.longitude = f64::INFINITY;
        assert!(inf_lon.validate().is_err());

        let nan_radius = ReportListQuery {
            center_lat: Some(0.0),
            center_lon: Some(0.0),
            radius_km: f64::NAN,
            ..ReportListQuery::default()
        };
        assert!(nan_radius.validate().is_err());

        let nan_center = ReportListQuery {
            center_lat: Some(f64::NAN),
            center_lon: Some(0.0),
            ..ReportListQuery::default()
        };
        assert!(nan_center.validate().is_err());

        let inf_center = ReportListQuery {
            center_lat: Some(0.0),
            center_lon: Some(f64::NEG_INFINITY),
            ..ReportListQuery::default()
        };
        assert!(inf_center.validate().is_err());
    }

    #[test]
    fn test_center_requires_both_coordinates() {
        let only_lat = ReportListQuery {
            center_lat: Some(1.0),
            ..ReportListQuery::default()
        };
        assert!(only_lat.center().is_none());

        let both = ReportListQuery {
            center_lat: Some(1.0),
            center_lon: Some(2.0),
            ..ReportListQuery::default()
        };
        assert_eq!(both.center(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("application/pdf"), None);
        assert!(ALLOWED_IMAGE_TYPES
            .iter()
            .all(|t| image_extension(t).is_some()));
    }
}
