use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::features::departments::handlers;
use crate::features::departments::services::DepartmentService;

/// Department and category mapping routes
///
/// Reads are public; mutations are guarded per handler by `RequireApiKey`.
pub fn routes(service: Arc<DepartmentService>) -> Router {
    Router::new()
        .route(
            "/api/departments",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route(
            "/api/departments/{id}",
            get(handlers::get_department)
                .put(handlers::update_department)
                .delete(handlers::delete_department),
        )
        .route(
            "/api/category-mappings",
            get(handlers::list_category_mappings),
        )
        .route(
            "/api/category-mappings/{category}",
            put(handlers::upsert_category_mapping).delete(handlers::delete_category_mapping),
        )
        .with_state(service)
}
