//! Logout handling.
//!
//! # Spring Security Equivalent
//! `logout()` / `LogoutFilter`
//!
//! Logout is on by default. The session is invalidated and the browser is
//! sent to the logout success URL. While CSRF protection is enabled only
//! `POST` triggers it; with CSRF disabled any method does.

use actix_session::Session;
use actix_web::http::Method;
use actix_web::HttpResponse;

use crate::http::security::form_login::redirect;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};

/// # Spring Security Equivalent
/// `LogoutConfigurer`
#[derive(Debug, Clone)]
pub struct LogoutConfig {
    logout_url: String,
    logout_success_url: Option<String>,
    invalidate_http_session: bool,
}

impl Default for LogoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutConfig {
    pub fn new() -> Self {
        Self {
            logout_url: "/logout".to_string(),
            logout_success_url: None,
            invalidate_http_session: true,
        }
    }

    /// # Spring Equivalent
    /// `logout().logoutUrl("/logout")`
    pub fn logout_url(mut self, url: &str) -> Self {
        self.logout_url = url.to_string();
        self
    }

    /// Defaults to `<login_page>?logout`.
    pub fn logout_success_url(mut self, url: &str) -> Self {
        self.logout_success_url = Some(url.to_string());
        self
    }

    /// With `false` only the principal is removed and other attributes survive.
    pub fn invalidate_http_session(mut self, invalidate: bool) -> Self {
        self.invalidate_http_session = invalidate;
        self
    }

    pub fn get_logout_url(&self) -> &str {
        &self.logout_url
    }

    pub fn get_logout_success_url(&self, login_page: &str) -> String {
        self.logout_success_url
            .clone()
            .unwrap_or_else(|| format!("{}?logout", login_page))
    }
}

/// # Spring Security Equivalent
/// `LogoutFilter` with `SecurityContextLogoutHandler`
#[derive(Debug, Clone)]
pub struct LogoutHandler {
    logout_url: String,
    success_url: String,
    invalidate_http_session: bool,
    post_only: bool,
    session_config: SessionConfig,
}

impl LogoutHandler {
    pub fn new(config: &LogoutConfig, login_page: &str, post_only: bool, session_config: SessionConfig) -> Self {
        Self {
            logout_url: config.logout_url.clone(),
            success_url: config.get_logout_success_url(login_page),
            invalidate_http_session: config.invalidate_http_session,
            post_only,
            session_config,
        }
    }

    pub fn is_logout_request(&self, method: &Method, path: &str) -> bool {
        path == self.logout_url && (!self.post_only || *method == Method::POST)
    }

    pub fn logout(&self, session: &Session) -> HttpResponse {
        if self.invalidate_http_session {
            SessionAuthenticator::logout(session);
        } else {
            SessionAuthenticator::clear_authentication(session, &self.session_config);
        }
        redirect(self.success_url.clone())
    }

    pub fn success_url(&self) -> &str {
        &self.success_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::User;
    use actix_session::SessionExt;
    use actix_web::http::header::LOCATION;
    use actix_web::test::TestRequest;

    #[test]
    fn test_defaults() {
        let config = LogoutConfig::default();
        assert_eq!(config.get_logout_url(), "/logout");
        assert_eq!(config.get_logout_success_url("/login"), "/login?logout");
        assert_eq!(
            config.logout_success_url("/bye").get_logout_success_url("/login"),
            "/bye"
        );
    }

    #[test]
    fn test_method_matching() {
        let config = LogoutConfig::new();
        let any = LogoutHandler::new(&config, "/login", false, SessionConfig::default());
        assert!(any.is_logout_request(&Method::GET, "/logout"));
        assert!(any.is_logout_request(&Method::POST, "/logout"));
        assert!(!any.is_logout_request(&Method::GET, "/api/v1/logout"));

        let post_only = LogoutHandler::new(&config, "/login", true, SessionConfig::default());
        assert!(!post_only.is_logout_request(&Method::GET, "/logout"));
        assert!(post_only.is_logout_request(&Method::POST, "/logout"));
    }

    #[test]
    fn test_logout_keeps_attributes_when_not_invalidating() {
        let session_config = SessionConfig::default();
        let handler = LogoutHandler::new(
            &LogoutConfig::new().invalidate_http_session(false),
            "/login",
            false,
            session_config.clone(),
        );
        let session = TestRequest::default().to_srv_request().get_session();
        SessionAuthenticator::login(&session, &User::without_password("u"), &session_config).unwrap();
        session.insert("lot", 7).unwrap();

        let res = handler.logout(&session);
        assert_eq!(res.status(), 302);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/login?logout");
        assert!(!SessionAuthenticator::is_authenticated(&session, &session_config));
        assert_eq!(session.get::<i32>("lot").unwrap(), Some(7));
    }
}
