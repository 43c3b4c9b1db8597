use axum::{extract::State, Json};
use std::sync::Arc;

use crate::core::error::AppError;
use crate::features::dashboard::dtos::DashboardDto;
use crate::features::dashboard::services::DashboardService;
use crate::shared::types::ApiResponse;

/// Get KPIs, recent reports and department performance
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard summary", body = ApiResponse<DashboardDto>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_dashboard(
    State(service): State<Arc<DashboardService>>,
) -> Result<Json<ApiResponse<DashboardDto>>, AppError> {
    let dashboard = service.get_dashboard().await?;
    Ok(Json(ApiResponse::success(Some(dashboard), None, None)))
}
