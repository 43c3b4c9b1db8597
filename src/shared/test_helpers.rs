#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use crate::features::auth::AdminApiKey;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Extension, Router};

/// Admin secret used by router tests
#[cfg(test)]
pub const TEST_API_KEY: &str = "test-admin-secret";

#[cfg(test)]
pub fn test_user() -> AuthenticatedUser {
    AuthenticatedUser {
        id: 42,
        name: "Test Citizen".to_string(),
        email: "citizen@example.com".to_string(),
    }
}

#[cfg(test)]
async fn inject_test_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(test_user());
    next.run(request).await
}

/// Wrap a router so every request carries [`test_user`] as its identity
#[cfg(test)]
pub fn with_authenticated_user(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_test_user_middleware))
}

/// Wrap a router with the admin key extension expected by `RequireApiKey`
#[cfg(test)]
pub fn with_admin_key(router: Router) -> Router {
    router.layer(Extension(AdminApiKey::new(TEST_API_KEY)))
}
