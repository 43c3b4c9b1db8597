use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::RequireApiKey;
use crate::features::departments::dtos::{
    validate_category_name, CategoryMappingResponseDto, CreateDepartmentDto,
    DepartmentResponseDto, UpdateDepartmentDto, UpsertCategoryMappingDto,
};
use crate::features::departments::services::DepartmentService;
use crate::shared::types::{ApiResponse, Meta};

/// List all departments
#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "departments",
    responses(
        (status = 200, description = "Departments ordered by name", body = ApiResponse<Vec<DepartmentResponseDto>>)
    )
)]
pub async fn list_departments(
    State(service): State<Arc<DepartmentService>>,
) -> Result<Json<ApiResponse<Vec<DepartmentResponseDto>>>> {
    let departments = service.list().await?;
    let total = departments.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(departments),
        None,
        Some(Meta { total }),
    )))
}

/// Get a department by ID
#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = ApiResponse<DepartmentResponseDto>),
        (status = 404, description = "Department not found")
    )
)]
pub async fn get_department(
    State(service): State<Arc<DepartmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DepartmentResponseDto>>> {
    let department = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(department), None, None)))
}

/// Create a department
#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "departments",
    request_body = CreateDepartmentDto,
    responses(
        (status = 201, description = "Department created", body = ApiResponse<DepartmentResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing API key"),
        (status = 403, description = "Invalid API key"),
        (status = 409, description = "Name or email already in use")
    ),
    security(("api_key" = []))
)]
pub async fn create_department(
    _: RequireApiKey,
    State(service): State<Arc<DepartmentService>>,
    AppJson(dto): AppJson<CreateDepartmentDto>,
) -> Result<(StatusCode, Json<ApiResponse<DepartmentResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let department = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(department),
            Some("Department created".to_string()),
            None,
        )),
    ))
}

/// Update a department
#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    request_body = UpdateDepartmentDto,
    responses(
        (status = 200, description = "Department updated", body = ApiResponse<DepartmentResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name or email already in use")
    ),
    security(("api_key" = []))
)]
pub async fn update_department(
    _: RequireApiKey,
    State(service): State<Arc<DepartmentService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateDepartmentDto>,
) -> Result<Json<ApiResponse<DepartmentResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let department = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(department), None, None)))
}

/// Delete a department
#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 400, description = "Department still has active reports"),
        (status = 404, description = "Department not found")
    ),
    security(("api_key" = []))
)]
pub async fn delete_department(
    _: RequireApiKey,
    State(service): State<Arc<DepartmentService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Department deleted".to_string()),
        None,
    )))
}

/// List category → department mappings
#[utoipa::path(
    get,
    path = "/api/category-mappings",
    tag = "departments",
    responses(
        (status = 200, description = "Mappings ordered by category", body = ApiResponse<Vec<CategoryMappingResponseDto>>)
    )
)]
pub async fn list_category_mappings(
    State(service): State<Arc<DepartmentService>>,
) -> Result<Json<ApiResponse<Vec<CategoryMappingResponseDto>>>> {
    let mappings = service.list_mappings().await?;
    Ok(Json(ApiResponse::success(Some(mappings), None, None)))
}

/// Create or change the department a category routes to
#[utoipa::path(
    put,
    path = "/api/category-mappings/{category}",
    tag = "departments",
    params(("category" = String, Path, description = "Category name, e.g. Pothole (trimmed, no control characters)")),
    request_body = UpsertCategoryMappingDto,
    responses(
        (status = 200, description = "Mapping saved", body = ApiResponse<CategoryMappingResponseDto>),
        (status = 400, description = "Invalid category name"),
        (status = 404, description = "Department not found")
    ),
    security(("api_key" = []))
)]
pub async fn upsert_category_mapping(
    _: RequireApiKey,
    State(service): State<Arc<DepartmentService>>,
    Path(category): Path<String>,
    AppJson(dto): AppJson<UpsertCategoryMappingDto>,
) -> Result<Json<ApiResponse<CategoryMappingResponseDto>>> {
    validate_category_name(&category)?;

    let mapping = service
        .upsert_mapping(&category, dto.department_id)
        .await?;
    Ok(Json(ApiResponse::success(Some(mapping), None, None)))
}

/// Remove a category mapping
#[utoipa::path(
    delete,
    path = "/api/category-mappings/{category}",
    tag = "departments",
    params(("category" = String, Path, description = "Category name")),
    responses(
        (status = 200, description = "Mapping removed"),
        (status = 404, description = "Mapping not found")
    ),
    security(("api_key" = []))
)]
pub async fn delete_category_mapping(
    _: RequireApiKey,
    State(service): State<Arc<DepartmentService>>,
    Path(category): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    validate_category_name(&category)?;

    service.delete_mapping(&category).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Mapping deleted".to_string()),
        None,
    )))
}
