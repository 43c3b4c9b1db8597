use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for a department
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Routing entry: reports classified as `category_name` go to `department_id`
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CategoryMapping {
    pub category_name: String,
    pub department_id: i64,
    pub created_at: DateTime<Utc>,
}
