//! Core traits for authentication and authorization.
//!
//! # Spring Equivalent
//! `AuthenticationProvider` and `AuthorizationManager` interfaces

use actix_web::dev::ServiceRequest;

use crate::http::security::authorizer::AuthorizationDecision;
use crate::http::security::user::User;

/// Extracts the user identity already attached to a request.
///
/// # Spring Equivalent
/// `SecurityContextRepository.loadContext`
///
/// Returns an owned `User` so it can be stored in request extensions
/// for access by handlers.
pub trait Authenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<User>;
}

/// Decides whether a request may proceed for the given user.
///
/// # Spring Equivalent
/// `AuthorizationManager<HttpServletRequest>`
pub trait Authorizer {
    fn decide(&self, req: &ServiceRequest, user: Option<&User>) -> AuthorizationDecision;
}
