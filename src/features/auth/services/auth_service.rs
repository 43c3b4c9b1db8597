use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{
    LoginRequestDto, RegisterRequestDto, TokenResponseDto, UserResponseDto,
};
use crate::features::auth::model::{AuthenticatedUser, NewUser};
use crate::features::auth::services::{
    hash_password, verify_password, TokenService, UserRepository,
};

const INVALID_CREDENTIALS: &str = "Incorrect email or password";

/// Registration, login and bearer-token authentication against local accounts
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Register a new citizen account
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<UserResponseDto> {
        let email = normalize_email(&dto.email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hashed_password = hash_password(dto.password).await?;
        let user = self
            .users
            .create(NewUser {
                name: dto.name.trim().to_string(),
                email,
                hashed_password,
            })
            .await?;

        tracing::info!("Registered user id={}", user.id);
        Ok(user.into())
    }

    /// Verify credentials and issue an access token
    pub async fn login(&self, dto: LoginRequestDto) -> Result<TokenResponseDto> {
        let email = normalize_email(&dto.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(dto.password, user.hashed_password.clone()).await? {
            tracing::info!("Rejected login for user id={}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let access_token = self.tokens.issue(&user.email)?;

        Ok(TokenResponseDto {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
        })
    }

    /// Resolve a bearer token to the stored user it was issued for
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.tokens.verify(token)?;

        self.users
            .find_by_email(&claims.sub)
            .await?
            .map(AuthenticatedUser::from)
            .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
