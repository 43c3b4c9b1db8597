//! Departments and the category → department routing table.
//!
//! | Method | Endpoint | Auth |
//! |--------|----------|------|
//! | GET | `/api/departments` | - |
//! | GET | `/api/departments/{id}` | - |
//! | POST | `/api/departments` | X-API-Key |
//! | PUT/DELETE | `/api/departments/{id}` | X-API-Key |
//! | GET | `/api/category-mappings` | - |
//! | PUT/DELETE | `/api/category-mappings/{category}` | X-API-Key |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{DepartmentService, PgDepartmentRepository, PgDepartmentResolver};
