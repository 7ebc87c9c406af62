use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::CallerIdentity,
        dto::{
            EmailCheckResponse, EmailQuery, LoginRequest, LoginResponse, ProfileImageRequest,
            PromoteRequest, PublicUser, RegisterRequest,
        },
        extractors::AuthUser,
        password::{check_password_policy, hash_password, is_valid_email, verify_password},
        repo_types::{NewUser, Role, User},
    },
    db::StoreError,
    error::AppError,
    extract::{AppJson, AppQuery},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/check", get(check_email))
        .route("/auth/promote", put(promote))
        .route("/auth/load-profile", get(load_profile))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me/profile-image", put(update_profile_image))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    state.tokens.issue(&CallerIdentity::from(user)).map_err(|e| {
        error!(error = %e, user_id = %user.id, "jwt sign failed");
        AppError::Internal
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, AppJson<LoginResponse>), AppError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("INVALID_EMAIL", "Invalid email"));
    }

    if let Err(e) = check_password_policy(&payload.password) {
        warn!("password too short");
        return Err(e);
    }

    let user_name = payload.user_name.trim();
    if user_name.is_empty() {
        return Err(AppError::bad_request("INVALID_USER_NAME", "User name is required"));
    }

    // Ensure email is not taken
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict("EMAIL_TAKEN", "Email already registered"));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        AppError::Internal
    })?;

    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::Common
    };

    let user = state
        .users
        .create(NewUser {
            email,
            password_hash,
            user_name: user_name.to_string(),
            role,
            profile_image: payload.profile_image,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::conflict("EMAIL_TAKEN", "Email already registered"),
            other => AppError::from(other),
        })?;

    let token = issue_token(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, AppJson(LoginResponse::new(user, token))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<AppJson<LoginResponse>, AppError> {
    let email = normalize_email(&payload.email);

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        AppError::Internal
    })?;

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(AppJson(LoginResponse::new(user, token)))
}

#[instrument(skip(state))]
pub async fn check_email(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EmailQuery>,
) -> Result<AppJson<EmailCheckResponse>, AppError> {
    let email = normalize_email(&query.email);
    let taken = state.users.find_by_email(&email).await?.is_some();
    Ok(AppJson(EmailCheckResponse { taken }))
}

/// Raises the target account to ADMIN. Tokens already held by the target keep
/// their old role until they expire.
#[instrument(skip(state, payload))]
pub async fn promote(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<PromoteRequest>,
) -> Result<AppJson<PublicUser>, AppError> {
    caller.require_role(Role::Admin)?;

    let email = normalize_email(&payload.email);
    let target = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let promoted = state
        .users
        .update_role(target.id, Role::Admin)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    info!(by = %caller.user_id, user_id = %promoted.id, "user promoted");
    Ok(AppJson(PublicUser::from(promoted)))
}

#[instrument(skip(state))]
pub async fn load_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<AppJson<PublicUser>, AppError> {
    let user = state.users.find_by_id(caller.user_id).await?.ok_or_else(|| {
        warn!(user_id = %caller.user_id, "token for unknown user");
        AppError::not_found("user")
    })?;
    Ok(AppJson(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile_image(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<ProfileImageRequest>,
) -> Result<AppJson<PublicUser>, AppError> {
    let profile_image = payload
        .profile_image
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let user = state
        .users
        .update_profile_image(caller.user_id, profile_image)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    info!(user_id = %user.id, "profile image updated");
    Ok(AppJson(PublicUser::from(user)))
}
