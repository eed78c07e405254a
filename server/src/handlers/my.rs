//! Member area (requires USER or ADMIN role - protected by middleware).

use actix_web::{get, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use parking_security_core::http::security::{AuthenticatedUser, User};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub username: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub authorities: Vec<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            username: user.get_username().to_string(),
            display_name: user.get_display_name().to_string(),
            roles: user.get_roles().to_vec(),
            authorities: user.get_authorities().to_vec(),
        }
    }
}

/// Landing page after form and social login.
#[get("/api/v1/my")]
pub async fn my(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(UserResponse::from(&*user))
}

#[get("/api/v1/my/profile")]
pub async fn profile(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(UserResponse::from(&*user))
}
