mod auth_service;
mod password;
mod token_service;
mod user_repository;

pub use auth_service::AuthService;
pub use password::{hash_password, verify_password};
pub use token_service::{Claims, TokenError, TokenService};
pub use user_repository::{PgUserRepository, UserRepository};

#[cfg(test)]
pub use user_repository::MockUserRepository;
