//! Sign-up and username availability (public).

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use parking_security_core::http::security::{InMemoryUserDetailsManager, User, UserStoreError};

use crate::error::ApiError;
use crate::oauth2_user_service::{CustomOAuth2UserService, DEFAULT_ROLE};

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub username: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub username: String,
    pub roles: Vec<String>,
}

/// Registers a local account with a BCrypt-encoded password and role `USER`.
#[post("/api/v1/join")]
pub async fn join(
    users: web::Data<InMemoryUserDetailsManager>,
    body: web::Json<JoinRequest>,
) -> Result<HttpResponse, ApiError> {
    let JoinRequest { username, password, name } = body.into_inner();
    let username = username.trim().to_string();
    if username.is_empty() || password.trim().is_empty() {
        return Err(ApiError::BadRequest("username and password are required".to_string()));
    }
    if CustomOAuth2UserService::is_social_username(&username) {
        return Err(ApiError::BadRequest(format!(
            "username '{}' is reserved for social login",
            username
        )));
    }
    if users.user_exists(&username) {
        return Err(ApiError::UsernameTaken(username));
    }

    let store = users.get_ref().clone();
    let encoded = web::block(move || store.password_encoder().encode(&password))
        .await
        .map_err(|e| {
            log::error!("Password encoding did not complete: {}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            log::error!("Could not encode password for '{}': {}", username, e);
            ApiError::Internal
        })?;
    let mut user = User::with_encoded_password(&username, encoded).roles(&[DEFAULT_ROLE.to_string()]);
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        user = user.display_name(name.trim());
    }

    users.create_user(user).map_err(|e| match e {
        UserStoreError::AlreadyExists(name) => ApiError::UsernameTaken(name),
        UserStoreError::NotFound(_) => ApiError::Internal,
    })?;
    log::info!("Registered user '{}'", username);

    Ok(HttpResponse::Created().json(JoinResponse {
        username,
        roles: vec![DEFAULT_ROLE.to_string()],
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub username: String,
    pub available: bool,
}

/// Tells the sign-up form whether a username is still free.
#[get("/confirm")]
pub async fn confirm(
    users: web::Data<InMemoryUserDetailsManager>,
    query: web::Query<ConfirmQuery>,
) -> Result<HttpResponse, ApiError> {
    let username = query.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    Ok(HttpResponse::Ok().json(ConfirmResponse {
        username: username.to_string(),
        available: !CustomOAuth2UserService::is_social_username(username) && !users.user_exists(username),
    }))
}
