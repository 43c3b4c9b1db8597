use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::analytics::handlers;
use crate::features::analytics::services::AnalyticsService;

pub fn routes(service: Arc<AnalyticsService>) -> Router {
    Router::new()
        .route("/api/analytics", get(handlers::get_analytics))
        .with_state(service)
}
