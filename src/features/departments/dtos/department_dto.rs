use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::departments::models::{CategoryMapping, Department};
use crate::shared::validation::CATEGORY_NAME_REGEX;

/// Longest category name a mapping may use
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepartmentResponseDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Department> for DepartmentResponseDto {
    fn from(d: Department) -> Self {
        Self {
            id: d.id,
            name: d.name,
            email: d.email,
            created_at: d.created_at,
        }
    }
}

/// Request DTO for creating a department
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDepartmentDto {
    /// Department name (2-100 characters, unique)
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    #[schema(example = "Public Works")]
    pub name: String,

    /// Contact email (unique)
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "works@city.gov")]
    pub email: String,
}

/// Request DTO for updating a department; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDepartmentDto {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

impl UpdateDepartmentDto {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryMappingResponseDto {
    pub category_name: String,
    pub department_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryMapping> for CategoryMappingResponseDto {
    fn from(m: CategoryMapping) -> Self {
        Self {
            category_name: m.category_name,
            department_id: m.department_id,
            created_at: m.created_at,
        }
    }
}

/// Request DTO for pointing a category at a department
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertCategoryMappingDto {
    #[schema(example = 3)]
    pub department_id: i64,
}

/// Checks a category name taken from the request path
pub fn validate_category_name(category: &str) -> Result<()> {
    if category.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Category name must be at most {} characters",
            MAX_CATEGORY_NAME_LEN
        )));
    }
    if !CATEGORY_NAME_REGEX.is_match(category) {
        return Err(AppError::Validation(
            "Category name must be non-empty, have no leading or trailing whitespace \
             and contain no control characters"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_department_validation() {
        let ok = CreateDepartmentDto {
            name: "Public Works".to_string(),
            email: "works@city.gov".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short_name = CreateDepartmentDto {
            name: "P".to_string(),
            email: "works@city.gov".to_string(),
        };
        assert!(short_name.validate().is_err());

        let bad_email = CreateDepartmentDto {
            name: "Public Works".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_update_department_partial() {
        let empty = UpdateDepartmentDto::default();
        assert!(empty.is_empty());
        assert!(empty.validate().is_ok());

        let name_only = UpdateDepartmentDto {
            name: Some("Parks".to_string()),
            email: None,
        };
        assert!(!name_only.is_empty());
        assert!(name_only.validate().is_ok());

        let bad = UpdateDepartmentDto {
            name: None,
            email: Some("nope".to_string()),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_category_name() {
        assert!(validate_category_name("Pothole").is_ok());
        assert!(validate_category_name("Parks & Recreation").is_ok());
        assert!(validate_category_name("Pothole (Minor)").is_ok());
        assert!(validate_category_name("Kid's_Park, North").is_ok());
        assert!(validate_category_name(&"é".repeat(100)).is_ok());
        assert!(matches!(
            validate_category_name(" Pothole"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_category_name("Road\nDamage").is_err());
        assert!(validate_category_name("").is_err());
        assert!(validate_category_name(&"a".repeat(101)).is_err());
    }
}
