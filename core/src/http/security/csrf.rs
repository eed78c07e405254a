//! CSRF (Cross-Site Request Forgery) Protection.
//!
//! # Spring Security Equivalent
//! `CsrfFilter` with `HttpSessionCsrfTokenRepository`
//!
//! Enabled by default in [`HttpSecurity`](super::http_security::HttpSecurity)
//! and switched off with `.csrf(|c| c.disable())`. When enabled, the token for
//! the session is placed in request extensions as [`CsrfToken`] and every
//! state-changing request must echo it in the `X-CSRF-TOKEN` header or a
//! `_csrf` parameter in the query string or urlencoded body.

use std::sync::Arc;

use actix_session::SessionExt;
use actix_web::dev::{Payload, ServiceRequest};
use actix_web::http::Method;
use actix_web::web::Bytes;
use actix_web::HttpMessage;
use derive_more::{Display, Error};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::http::security::ant_matcher::AntMatchers;

// =============================================================================
// CSRF Token
// =============================================================================

/// # Spring Security Equivalent
/// `CsrfToken`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    token: String,
    header_name: String,
    parameter_name: String,
}

impl CsrfToken {
    pub fn new(token: String, header_name: &str, parameter_name: &str) -> Self {
        Self {
            token,
            header_name: header_name.to_string(),
            parameter_name: parameter_name.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.token
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
}

// =============================================================================
// Token Repository
// =============================================================================

/// # Spring Security Equivalent
/// `CsrfTokenRepository`
pub trait CsrfTokenRepository: Send + Sync {
    fn generate_token(&self) -> String;

    fn save_token(&self, req: &ServiceRequest, token: &str) -> Result<(), CsrfError>;

    fn load_token(&self, req: &ServiceRequest) -> Option<String>;
}

/// Keeps the token in the user's session.
///
/// # Spring Security Equivalent
/// `HttpSessionCsrfTokenRepository`
#[derive(Debug, Clone)]
pub struct SessionCsrfTokenRepository {
    session_key: String,
}

impl Default for SessionCsrfTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCsrfTokenRepository {
    pub fn new() -> Self {
        Self {
            session_key: "CSRF_TOKEN".to_string(),
        }
    }

    pub fn session_key(mut self, key: &str) -> Self {
        self.session_key = key.to_string();
        self
    }
}

impl CsrfTokenRepository for SessionCsrfTokenRepository {
    fn generate_token(&self) -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(bytes)
    }

    fn save_token(&self, req: &ServiceRequest, token: &str) -> Result<(), CsrfError> {
        req.get_session()
            .insert(&self.session_key, token)
            .map_err(|e| CsrfError::Storage(e.to_string()))
    }

    fn load_token(&self, req: &ServiceRequest) -> Option<String> {
        req.get_session().get::<String>(&self.session_key).ok().flatten()
    }
}

// =============================================================================
// CSRF Configuration
// =============================================================================

/// # Spring Security Equivalent
/// `CsrfConfigurer`
#[derive(Clone)]
pub struct CsrfConfig {
    enabled: bool,
    repository: Arc<dyn CsrfTokenRepository>,
    protected_methods: Vec<Method>,
    ignored_paths: AntMatchers,
    header_name: String,
    parameter_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfConfig {
    /// Enabled, session-backed, protecting `POST`, `PUT`, `PATCH` and `DELETE`.
    pub fn new() -> Self {
        Self {
            enabled: true,
            repository: Arc::new(SessionCsrfTokenRepository::new()),
            protected_methods: vec![Method::POST, Method::PUT, Method::PATCH, Method::DELETE],
            ignored_paths: AntMatchers::new(),
            header_name: "X-CSRF-TOKEN".to_string(),
            parameter_name: "_csrf".to_string(),
        }
    }

    /// # Spring Equivalent
    /// `csrf(AbstractHttpConfigurer::disable)`
    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn repository<R: CsrfTokenRepository + 'static>(mut self, repository: R) -> Self {
        self.repository = Arc::new(repository);
        self
    }

    pub fn protected_methods(mut self, methods: Vec<Method>) -> Self {
        self.protected_methods = methods;
        self
    }

    /// # Spring Equivalent
    /// `csrf().ignoringRequestMatchers("/api/webhook/**")`
    pub fn ignoring_request_matchers<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        for pattern in patterns {
            self.ignored_paths = self.ignored_paths.add(pattern.as_ref());
        }
        self
    }

    pub fn header_name(mut self, name: &str) -> Self {
        self.header_name = name.to_string();
        self
    }

    pub fn parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = name.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn requires_protection(&self, method: &Method, path: &str) -> bool {
        self.protected_methods.contains(method) && !self.ignored_paths.matches(path)
    }

    /// Loads (or creates) the session token, exposes it to handlers and
    /// validates the token submitted in the header or the query string.
    ///
    /// Always `Ok` when disabled.
    pub fn check(&self, req: &ServiceRequest) -> Result<(), CsrfError> {
        self.validate(req, None)
    }

    /// Like [`check`](Self::check), but a urlencoded body may also carry the
    /// `_csrf` parameter. The body is buffered and put back for the handler.
    pub async fn check_request(&self, req: &mut ServiceRequest) -> Result<(), CsrfError> {
        let reads_body = self.enabled
            && self.requires_protection(req.method(), req.path())
            && !req.headers().contains_key(self.header_name.as_str())
            && req.content_type() == "application/x-www-form-urlencoded";
        if !reads_body {
            return self.validate(req, None);
        }

        let body = req
            .extract::<Bytes>()
            .await
            .map_err(|_| CsrfError::MissingToken)?;
        req.set_payload(Payload::from(body.clone()));

        let submitted = url::form_urlencoded::parse(&body)
            .find(|(name, _)| *name == self.parameter_name)
            .map(|(_, value)| value.into_owned());
        self.validate(req, submitted)
    }

    fn validate(&self, req: &ServiceRequest, body_token: Option<String>) -> Result<(), CsrfError> {
        if !self.enabled {
            return Ok(());
        }

        let token = match self.repository.load_token(req) {
            Some(token) => token,
            None => {
                let token = self.repository.generate_token();
                self.repository.save_token(req, &token)?;
                token
            }
        };
        req.extensions_mut()
            .insert(CsrfToken::new(token.clone(), &self.header_name, &self.parameter_name));

        if !self.requires_protection(req.method(), req.path()) {
            return Ok(());
        }

        match self.token_from_request(req).or(body_token) {
            Some(submitted) if bool::from(submitted.as_bytes().ct_eq(token.as_bytes())) => Ok(()),
            Some(_) => Err(CsrfError::InvalidToken),
            None => Err(CsrfError::MissingToken),
        }
    }

    fn token_from_request(&self, req: &ServiceRequest) -> Option<String> {
        if let Some(value) = req.headers().get(self.header_name.as_str()) {
            if let Ok(token) = value.to_str() {
                return Some(token.to_string());
            }
        }

        url::form_urlencoded::parse(req.query_string().as_bytes())
            .find(|(name, _)| *name == self.parameter_name)
            .map(|(_, value)| value.into_owned())
    }
}

// =============================================================================
// CSRF Error
// =============================================================================

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum CsrfError {
    #[display("CSRF token missing")]
    MissingToken,
    #[display("CSRF token mismatch")]
    InvalidToken,
    #[display("CSRF token storage error: {_0}")]
    Storage(#[error(not(source))] String),
}
