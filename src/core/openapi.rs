use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::analytics::{dtos as analytics_dtos, handlers as analytics_handlers};
use crate::features::auth;
use crate::features::dashboard::{dtos as dashboard_dtos, handlers as dashboard_handlers};
use crate::features::departments::{dtos as departments_dtos, handlers as departments_handlers};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::shared::constants::API_KEY_HEADER;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::get_me,
        // Reports
        reports_handlers::submit_report,
        reports_handlers::list_my_reports,
        reports_handlers::list_all_reports,
        reports_handlers::update_report_status,
        // Departments
        departments_handlers::list_departments,
        departments_handlers::get_department,
        departments_handlers::create_department,
        departments_handlers::update_department,
        departments_handlers::delete_department,
        departments_handlers::list_category_mappings,
        departments_handlers::upsert_category_mapping,
        departments_handlers::delete_category_mapping,
        // Analytics and dashboard (public)
        analytics_handlers::get_analytics,
        dashboard_handlers::get_dashboard,
    ),
    components(
        schemas(
            Meta,
            // Auth
            auth::model::AuthenticatedUser,
            auth::dtos::RegisterRequestDto,
            auth::dtos::LoginRequestDto,
            auth::dtos::TokenResponseDto,
            auth::dtos::UserResponseDto,
            ApiResponse<auth::dtos::TokenResponseDto>,
            ApiResponse<auth::dtos::UserResponseDto>,
            // Reports
            reports_models::ReportStatus,
            reports_dtos::ReportDataDto,
            reports_dtos::SubmitReportForm,
            reports_dtos::ReportResponseDto,
            reports_dtos::UpdateReportStatusDto,
            ApiResponse<reports_dtos::ReportResponseDto>,
            ApiResponse<Vec<reports_dtos::ReportResponseDto>>,
            // Departments
            departments_dtos::DepartmentResponseDto,
            departments_dtos::CreateDepartmentDto,
            departments_dtos::UpdateDepartmentDto,
            departments_dtos::CategoryMappingResponseDto,
            departments_dtos::UpsertCategoryMappingDto,
            ApiResponse<departments_dtos::DepartmentResponseDto>,
            ApiResponse<Vec<departments_dtos::DepartmentResponseDto>>,
            ApiResponse<departments_dtos::CategoryMappingResponseDto>,
            ApiResponse<Vec<departments_dtos::CategoryMappingResponseDto>>,
            // Analytics
            analytics_dtos::AnalyticsDto,
            ApiResponse<analytics_dtos::AnalyticsDto>,
            // Dashboard
            dashboard_dtos::DashboardDto,
            dashboard_dtos::KpiDto,
            dashboard_dtos::RecentReportDto,
            dashboard_dtos::DepartmentPerformanceDto,
            ApiResponse<dashboard_dtos::DashboardDto>,
        )
    ),
    tags(
        (name = "auth", description = "Citizen registration and login"),
        (name = "reports", description = "Report submission, listing and status updates"),
        (name = "departments", description = "Departments and category routing"),
        (name = "analytics", description = "Report totals (public)"),
        (name = "Dashboard", description = "Admin dashboard summary (public)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Civic Issue Reporting API",
        version = "0.1.0",
        description = "Citizen report submission, classification and routing",
    )
)]
pub struct ApiDoc;

/// Adds the bearer JWT and X-API-Key security schemes to the OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes_and_schemes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/reports"));
        assert!(paths.contains_key("/api/reports/{id}/status"));
        assert!(paths.contains_key("/api/category-mappings/{category}"));
        assert!(paths.contains_key("/api/dashboard"));

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert!(schemes.contains_key("api_key"));
    }

    #[test]
    fn test_swagger_info_modifier() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.version, "9.9.9");
    }
}
