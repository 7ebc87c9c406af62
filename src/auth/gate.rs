//! Request gate: decides per request whether a token is required, validates it
//! and attaches the caller identity to the request extensions.
//!
//! Rules are evaluated in order and the first match wins, so the narrow
//! authenticated carve-outs under `/api/auth` must stay above the broad permit.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use tracing::{debug, warn};

use crate::auth::claims::CallerIdentity;
use crate::error::{AppError, AuthFailure};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Permit,
    Authenticated,
}

#[derive(Debug, Clone, Copy)]
pub enum PathPattern {
    Exact(&'static str),
    /// `base` itself and everything below `base/`.
    Prefix(&'static str),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match *self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(base) => path
                .strip_prefix(base)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessRule {
    /// `None` matches any method.
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub access: Access,
}

impl AccessRule {
    fn new(method: Option<Method>, pattern: PathPattern, access: Access) -> Self {
        Self {
            method,
            pattern,
            access,
        }
    }

    fn applies(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.matches(path)
    }
}

lazy_static! {
    static ref ACCESS_RULES: Vec<AccessRule> = vec![
        AccessRule::new(
            Some(Method::PUT),
            PathPattern::Exact("/api/auth/promote"),
            Access::Authenticated,
        ),
        AccessRule::new(
            None,
            PathPattern::Exact("/api/auth/load-profile"),
            Access::Authenticated,
        ),
        AccessRule::new(None, PathPattern::Exact("/"), Access::Permit),
        AccessRule::new(None, PathPattern::Prefix("/api/auth"), Access::Permit),
    ];
}

/// First matching rule decides; unmatched requests need a token.
pub fn required_access(method: &Method, path: &str) -> Access {
    ACCESS_RULES
        .iter()
        .find(|rule| rule.applies(method, path))
        .map_or(Access::Authenticated, |rule| rule.access)
}

/// `Ok(None)` when no credential header was sent.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthFailure> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthFailure::Malformed)?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or(AuthFailure::Malformed)
}

/// Axum middleware enforcing [`required_access`] for every route.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access = required_access(req.method(), req.uri().path());

    let verified = match bearer_token(req.headers()) {
        Ok(Some(token)) => Some(state.tokens.verify(token).map_err(AuthFailure::from)),
        Ok(None) => None,
        Err(failure) => Some(Err(failure)),
    };

    let identity = match (access, verified) {
        (_, Some(Ok(claims))) => Some(CallerIdentity::from(claims)),
        (Access::Permit, Some(Err(failure))) => {
            debug!(?failure, path = %req.uri().path(), "ignoring bad token on open route");
            None
        }
        (Access::Permit, None) => None,
        (Access::Authenticated, Some(Err(failure))) => {
            warn!(?failure, path = %req.uri().path(), "token rejected");
            return Err(AppError::Unauthenticated(failure));
        }
        (Access::Authenticated, None) => {
            debug!(path = %req.uri().path(), "missing token");
            return Err(AppError::Unauthenticated(AuthFailure::Missing));
        }
    };

    if let Some(identity) = identity {
        debug!(user_id = %identity.user_id, role = %identity.role, "caller authenticated");
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}
