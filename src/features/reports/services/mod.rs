pub mod location_filter;
mod report_repository;
mod report_service;
mod submission_service;

pub use report_repository::{PgReportRepository, ReportFilter, ReportRepository};
pub use report_service::{ReportPage, ReportService};
pub use submission_service::SubmissionService;

#[cfg(test)]
pub use report_repository::MockReportRepository;
