pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod departments;
pub mod reports;
