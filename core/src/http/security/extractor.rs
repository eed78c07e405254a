//! Extractors for accessing the current principal in handlers.
//!
//! # Spring Equivalent
//! `@AuthenticationPrincipal` / `SecurityContextHolder`

use std::future::{ready, Ready};
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::http::error::AuthError;
use crate::http::security::csrf::CsrfToken;
use crate::http::security::User;

/// The authenticated user.
///
/// # Errors
/// `401 Unauthorized` when the security middleware attached no user. Behind a
/// rule other than `permit_all` this cannot happen; the middleware answers first.
///
/// ```ignore
/// async fn profile(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.get_display_name())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    pub fn new(user: User) -> Self {
        AuthenticatedUser(user)
    }

    pub fn into_inner(self) -> User {
        self.0
    }
}

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<User>().cloned() {
            Some(user) => ready(Ok(AuthenticatedUser(user))),
            None => ready(Err(AuthError::Unauthorized)),
        }
    }
}

/// The user if one is logged in; never fails.
#[derive(Debug, Clone)]
pub struct OptionalUser(Option<User>);

impl OptionalUser {
    pub fn into_inner(self) -> Option<User> {
        self.0
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

impl Deref for OptionalUser {
    type Target = Option<User>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for OptionalUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalUser(req.extensions().get::<User>().cloned())))
    }
}

/// Security helpers on `HttpRequest`.
pub trait SecurityExt {
    fn get_user(&self) -> Option<User>;

    fn is_authenticated(&self) -> bool;

    fn has_role(&self, role: &str) -> bool;

    fn has_any_role(&self, roles: &[&str]) -> bool;

    /// Token to embed in forms when CSRF protection is enabled.
    fn csrf_token(&self) -> Option<CsrfToken>;
}

impl SecurityExt for HttpRequest {
    fn get_user(&self) -> Option<User> {
        self.extensions().get::<User>().cloned()
    }

    fn is_authenticated(&self) -> bool {
        self.extensions().get::<User>().is_some()
    }

    fn has_role(&self, role: &str) -> bool {
        self.extensions()
            .get::<User>()
            .is_some_and(|u| u.has_role(role))
    }

    fn has_any_role(&self, roles: &[&str]) -> bool {
        self.extensions()
            .get::<User>()
            .is_some_and(|u| u.has_any_role(roles))
    }

    fn csrf_token(&self) -> Option<CsrfToken> {
        self.extensions().get::<CsrfToken>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn with_user() -> HttpRequest {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut()
            .insert(User::without_password("driver").roles(&["USER".into()]));
        req
    }

    #[actix_web::test]
    async fn test_authenticated_user_extractor() {
        let req = with_user();
        let user = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(user.get_username(), "driver");

        let anonymous = TestRequest::default().to_http_request();
        assert!(matches!(
            AuthenticatedUser::extract(&anonymous).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[actix_web::test]
    async fn test_optional_user_extractor() {
        let anonymous = TestRequest::default().to_http_request();
        assert!(!OptionalUser::extract(&anonymous).await.unwrap().is_authenticated());
        assert!(OptionalUser::extract(&with_user()).await.unwrap().is_authenticated());
    }

    #[test]
    fn test_security_ext() {
        let req = with_user();
        assert!(req.is_authenticated());
        assert!(req.has_role("USER"));
        assert!(req.has_any_role(&["ADMIN", "USER"]));
        assert!(!req.has_role("ADMIN"));
        assert!(req.csrf_token().is_none());
    }
}
