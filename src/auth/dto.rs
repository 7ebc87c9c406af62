use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub user_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct EmailCheckResponse {
    pub taken: bool,
}

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileImageRequest {
    pub profile_image: Option<String>,
}

/// Sent after register or login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub email: String,
    pub user_name: String,
    #[serde(with = "iso_date")]
    pub join_date: Date,
    pub token: String,
    pub role: Role,
}

impl LoginResponse {
    pub fn new(user: User, token: String) -> Self {
        Self {
            email: user.email,
            user_name: user.user_name,
            join_date: user.join_date.date(),
            token,
            role: user.role,
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
    pub role: Role,
    pub profile_image: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_name: user.user_name,
            join_date: user.join_date,
            role: user.role,
            profile_image: user.profile_image,
        }
    }
}
