use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::claims::CallerIdentity;
use crate::error::{AppError, AuthFailure};

/// The caller identity attached by the request gate.
pub struct AuthUser(pub CallerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthenticated(AuthFailure::Missing))
    }
}
