mod department_repository;
mod department_resolver;
mod department_service;

pub use department_repository::{DepartmentRepository, PgDepartmentRepository, Taken};
pub use department_resolver::{DepartmentResolver, PgDepartmentResolver};
pub use department_service::DepartmentService;

#[cfg(test)]
pub use department_repository::MockDepartmentRepository;
#[cfg(test)]
pub use department_resolver::MockDepartmentResolver;
