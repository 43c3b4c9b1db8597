use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};

use crate::features::reports::handlers::{self, ReportState};

/// Upper bound on a whole submission request body
const MAX_SUBMISSION_BODY: usize = 50 * 1024 * 1024;

/// Routes for the authenticated citizen (auth middleware applied by caller)
pub fn protected_routes(state: ReportState) -> Router {
    Router::new()
        .route(
            "/api/reports",
            get(handlers::list_my_reports)
                .post(handlers::submit_report)
                .layer(DefaultBodyLimit::max(MAX_SUBMISSION_BODY)),
        )
        .with_state(state)
}

/// Public listing plus the API-key guarded status update
pub fn public_routes(state: ReportState) -> Router {
    Router::new()
        .route("/api/reports/all", get(handlers::list_all_reports))
        .route("/api/reports/{id}/status", put(handlers::update_report_status))
        .with_state(state)
}
