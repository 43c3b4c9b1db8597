use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::departments::models::{CategoryMapping, Department};

const DEPARTMENT_COLUMNS: &str = "id, name, email, created_at";

/// Which of a name/email pair already belongs to another department
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Taken {
    pub name: bool,
    pub email: bool,
}

/// Persistence port for departments and category mappings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// All departments ordered by name
    async fn list(&self) -> Result<Vec<Department>>;

    async fn find(&self, id: i64) -> Result<Option<Department>>;

    /// Uniqueness check for `name` and `email`, ignoring department `exclude`
    async fn taken(&self, name: &str, email: &str, exclude: Option<i64>) -> Result<Taken>;

    async fn insert(&self, name: &str, email: &str) -> Result<Department>;

    /// `None` when the department is gone
    async fn update(&self, id: i64, name: &str, email: &str) -> Result<Option<Department>>;

    /// Reports owned by the department whose status is not `resolved`
    async fn count_active_reports(&self, id: i64) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// All mappings ordered by category
    async fn list_mappings(&self) -> Result<Vec<CategoryMapping>>;

    /// Create the mapping or repoint an existing one
    async fn upsert_mapping(&self, category: &str, department_id: i64) -> Result<CategoryMapping>;

    /// `false` when no mapping existed for `category`
    async fn delete_mapping(&self, category: &str) -> Result<bool>;
}

pub struct PgDepartmentRepository {
    pool: PgPool,
}

impl PgDepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentRepository for PgDepartmentRepository {
    async fn list(&self) -> Result<Vec<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {} FROM departments ORDER BY name",
            DEPARTMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list departments: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find(&self, id: i64) -> Result<Option<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {} FROM departments WHERE id = $1",
            DEPARTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get department {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn taken(&self, name: &str, email: &str, exclude: Option<i64>) -> Result<Taken> {
        let (name, email) = sqlx::query_as::<_, (bool, bool)>(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM departments WHERE name = $1 AND ($3::BIGINT IS NULL OR id <> $3)),
                EXISTS(SELECT 1 FROM departments WHERE email = $2 AND ($3::BIGINT IS NULL OR id <> $3))
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(Taken { name, email })
    }

    async fn insert(&self, name: &str, email: &str) -> Result<Department> {
        sqlx::query_as::<_, Department>(&format!(
            "INSERT INTO departments (name, email) VALUES ($1, $2) RETURNING {}",
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, id: i64, name: &str, email: &str) -> Result<Option<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "UPDATE departments SET name = $1, email = $2 WHERE id = $3 RETURNING {}",
            DEPARTMENT_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn count_active_reports(&self, id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reports WHERE department_id = $1 AND status <> 'resolved'",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_mappings(&self) -> Result<Vec<CategoryMapping>> {
        let mappings = sqlx::query_as::<_, CategoryMapping>(
            "SELECT category_name, department_id, created_at FROM category_department_mapping ORDER BY category_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(mappings)
    }

    async fn upsert_mapping(&self, category: &str, department_id: i64) -> Result<CategoryMapping> {
        let mapping = sqlx::query_as::<_, CategoryMapping>(
            r#"
            INSERT INTO category_department_mapping (category_name, department_id)
            VALUES ($1, $2)
            ON CONFLICT (category_name) DO UPDATE SET department_id = EXCLUDED.department_id
            RETURNING category_name, department_id, created_at
            "#,
        )
        .bind(category)
        .bind(department_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(mapping)
    }

    async fn delete_mapping(&self, category: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM category_department_mapping WHERE category_name = $1")
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Unique violations that slip past the pre-check still surface as 409
fn map_write_error(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("Department name or email already exists".to_string())
    } else {
        tracing::error!("Failed to write department: {:?}", e);
        AppError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_unique_write_error_is_database() {
        assert!(matches!(
            map_write_error(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
    }
}
