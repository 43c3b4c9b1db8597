use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::analytics::dtos::AnalyticsDto;
use crate::features::analytics::services::AnalyticsService;
use crate::shared::types::ApiResponse;

/// Report totals by category and status
#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "analytics",
    responses(
        (status = 200, description = "Analytics summary", body = ApiResponse<AnalyticsDto>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_analytics(
    State(service): State<Arc<AnalyticsService>>,
) -> Result<Json<ApiResponse<AnalyticsDto>>> {
    let summary = service.summary().await?;
    Ok(Json(ApiResponse::success(Some(summary), None, None)))
}
