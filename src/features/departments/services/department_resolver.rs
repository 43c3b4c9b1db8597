use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};

/// Looks up which department handles a category.
///
/// A category without a mapping resolves to `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepartmentResolver: Send + Sync {
    async fn resolve(&self, category: &str) -> Result<Option<i64>>;
}

/// Resolver backed by the `category_department_mapping` table
pub struct PgDepartmentResolver {
    pool: PgPool,
}

impl PgDepartmentResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentResolver for PgDepartmentResolver {
    async fn resolve(&self, category: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT department_id FROM category_department_mapping WHERE category_name = $1",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve department for '{}': {:?}", category, e);
            AppError::Database(e)
        })
    }
}
