pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use guards::{AdminApiKey, RequireApiKey};
pub use services::{AuthService, PgUserRepository, TokenService};
