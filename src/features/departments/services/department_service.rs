use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::departments::dtos::{
    CategoryMappingResponseDto, CreateDepartmentDto, DepartmentResponseDto, UpdateDepartmentDto,
};
use crate::features::departments::models::Department;
use super::department_repository::DepartmentRepository;

/// Service for department and category mapping management
pub struct DepartmentService {
    repository: Arc<dyn DepartmentRepository>,
}

impl DepartmentService {
    pub fn new(repository: Arc<dyn DepartmentRepository>) -> Self {
        Self { repository }
    }

    // ========================================================================
    // Departments
    // ========================================================================

    pub async fn list(&self) -> Result<Vec<DepartmentResponseDto>> {
        let departments = self.repository.list().await?;
        Ok(departments.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<DepartmentResponseDto> {
        self.find(id).await.map(Into::into)
    }

    pub async fn create(&self, dto: CreateDepartmentDto) -> Result<DepartmentResponseDto> {
        self.ensure_unique(&dto.name, &dto.email, None).await?;

        let department = self.repository.insert(&dto.name, &dto.email).await?;

        tracing::info!("Created department {} ({})", department.id, department.name);
        Ok(department.into())
    }

    /// Applies the provided fields; an empty update returns the current record
    pub async fn update(&self, id: i64, dto: UpdateDepartmentDto) -> Result<DepartmentResponseDto> {
        let current = self.find(id).await?;

        if dto.is_empty() {
            return Ok(current.into());
        }

        let name = dto.name.as_deref().unwrap_or(&current.name);
        let email = dto.email.as_deref().unwrap_or(&current.email);
        self.ensure_unique(name, email, Some(id)).await?;

        let department = self
            .repository
            .update(id, name, email)
            .await?
            .ok_or_else(|| not_found(id))?;

        Ok(department.into())
    }

    /// Refuses while the department still owns reports that are not resolved
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.find(id).await?;

        let active = self.repository.count_active_reports(id).await?;
        if active > 0 {
            return Err(AppError::BadRequest(active_reports_message(active)));
        }

        self.repository.delete(id).await?;

        tracing::info!("Deleted department {}", id);
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Department> {
        self.repository.find(id).await?.ok_or_else(|| not_found(id))
    }

    async fn ensure_unique(&self, name: &str, email: &str, exclude: Option<i64>) -> Result<()> {
        let taken = self.repository.taken(name, email, exclude).await?;

        if taken.name {
            return Err(AppError::Conflict(format!(
                "Department with name '{}' already exists",
                name
            )));
        }
        if taken.email {
            return Err(AppError::Conflict(format!(
                "Department with email '{}' already exists",
                email
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Category mappings
    // ========================================================================

    pub async fn list_mappings(&self) -> Result<Vec<CategoryMappingResponseDto>> {
        let mappings = self.repository.list_mappings().await?;
        Ok(mappings.into_iter().map(Into::into).collect())
    }

    /// Creates or repoints the mapping for `category`
    pub async fn upsert_mapping(
        &self,
        category: &str,
        department_id: i64,
    ) -> Result<CategoryMappingResponseDto> {
        self.find(department_id).await?;

        let mapping = self.repository.upsert_mapping(category, department_id).await?;

        tracing::info!("Mapped category '{}' to department {}", category, department_id);
        Ok(mapping.into())
    }

    pub async fn delete_mapping(&self, category: &str) -> Result<()> {
        if !self.repository.delete_mapping(category).await? {
            return Err(AppError::NotFound(format!(
                "Mapping for category '{}' not found",
                category
            )));
        }
        Ok(())
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Department with ID {} not found", id))
}

fn active_reports_message(count: i64) -> String {
    format!(
        "Cannot delete department. It has {} active reports. Please resolve or reassign them first.",
        count
    )
}
