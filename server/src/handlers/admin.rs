//! Admin routes (protected by middleware).

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use parking_security_core::http::security::{AuthenticatedUser, InMemoryUserDetailsManager};

/// Admin-only endpoint (requires ADMIN role).
#[get("/api/v1/admin")]
pub async fn admin(user: AuthenticatedUser, users: web::Data<InMemoryUserDetailsManager>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "admin",
        "username": user.get_username(),
        "registeredUsers": users.len(),
    }))
}
