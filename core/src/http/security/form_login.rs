//! Form-based Login Authentication.
//!
//! # Spring Security Equivalent
//! `formLogin()` / `UsernamePasswordAuthenticationFilter`
//!
//! The security middleware consumes `POST <login_processing_url>` itself:
//! the urlencoded body is checked against a [`CredentialAuthenticator`],
//! the principal is stored in the session and the browser is redirected.
//! The login page is served by the application.
//!
//! # Example
//! ```
//! use parking_security_core::http::security::form_login::FormLoginConfig;
//!
//! let form_login = FormLoginConfig::new()
//!     .login_page("/login")
//!     .login_processing_url("/loginProc")
//!     .default_success_url("/api/v1/my", true)
//!     .permit_all();
//!
//! assert_eq!(form_login.get_failure_url(), "/login?error");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use actix_session::Session;
use actix_web::http::header::LOCATION;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};
use derive_more::{Display, Error};

use crate::http::security::session::{
    CredentialAuthenticator, SessionAuthenticator, SessionConfig, SessionError,
};
use crate::http::security::User;

// =============================================================================
// Form Login Configuration
// =============================================================================

/// # Spring Security Equivalent
/// `FormLoginConfigurer`
#[derive(Debug, Clone)]
pub struct FormLoginConfig {
    login_page: String,
    login_processing_url: String,
    username_parameter: String,
    password_parameter: String,
    default_success_url: String,
    always_use_default_success_url: bool,
    failure_url: Option<String>,
    permit_all: bool,
}

impl Default for FormLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FormLoginConfig {
    pub fn new() -> Self {
        Self {
            login_page: "/login".to_string(),
            login_processing_url: "/login".to_string(),
            username_parameter: "username".to_string(),
            password_parameter: "password".to_string(),
            default_success_url: "/".to_string(),
            always_use_default_success_url: false,
            failure_url: None,
            permit_all: false,
        }
    }

    /// # Spring Equivalent
    /// `formLogin().loginPage("/login")`
    pub fn login_page(mut self, url: &str) -> Self {
        self.login_page = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `formLogin().loginProcessingUrl("/loginProc")`
    pub fn login_processing_url(mut self, url: &str) -> Self {
        self.login_processing_url = url.to_string();
        self
    }

    pub fn username_parameter(mut self, param: &str) -> Self {
        self.username_parameter = param.to_string();
        self
    }

    pub fn password_parameter(mut self, param: &str) -> Self {
        self.password_parameter = param.to_string();
        self
    }

    /// Where to go after login. With `always` the saved request is ignored.
    ///
    /// # Spring Equivalent
    /// `formLogin().defaultSuccessUrl("/api/v1/my", true)`
    pub fn default_success_url(mut self, url: &str, always: bool) -> Self {
        self.default_success_url = url.to_string();
        self.always_use_default_success_url = always;
        self
    }

    /// Defaults to `<login_page>?error`.
    pub fn failure_url(mut self, url: &str) -> Self {
        self.failure_url = Some(url.to_string());
        self
    }

    /// Lets anonymous users reach the login page, processing URL and failure URL.
    ///
    /// # Spring Equivalent
    /// `formLogin().permitAll()`
    pub fn permit_all(mut self) -> Self {
        self.permit_all = true;
        self
    }

    pub fn get_login_page(&self) -> &str {
        &self.login_page
    }

    pub fn get_login_processing_url(&self) -> &str {
        &self.login_processing_url
    }

    pub fn get_username_parameter(&self) -> &str {
        &self.username_parameter
    }

    pub fn get_password_parameter(&self) -> &str {
        &self.password_parameter
    }

    pub fn get_default_success_url(&self) -> &str {
        &self.default_success_url
    }

    pub fn is_always_use_default_success_url(&self) -> bool {
        self.always_use_default_success_url
    }

    pub fn get_failure_url(&self) -> String {
        self.failure_url
            .clone()
            .unwrap_or_else(|| format!("{}?error", self.login_page))
    }

    pub fn is_permit_all(&self) -> bool {
        self.permit_all
    }

    /// Paths opened by [`permit_all`](Self::permit_all).
    pub fn permitted_paths(&self) -> Vec<String> {
        let failure = self.get_failure_url();
        let failure_path = failure.split('?').next().unwrap_or(&failure).to_string();
        vec![
            self.login_page.clone(),
            self.login_processing_url.clone(),
            failure_path,
        ]
    }
}

// =============================================================================
// Form Login Handler
// =============================================================================

/// Processes submitted login forms.
///
/// # Spring Security Equivalent
/// `UsernamePasswordAuthenticationFilter` with
/// `SavedRequestAwareAuthenticationSuccessHandler` and
/// `SimpleUrlAuthenticationFailureHandler`
#[derive(Clone)]
pub struct FormLoginHandler {
    config: FormLoginConfig,
    session_config: SessionConfig,
    authenticator: Arc<dyn CredentialAuthenticator>,
}

impl FormLoginHandler {
    pub fn new(
        config: FormLoginConfig,
        session_config: SessionConfig,
        authenticator: Arc<dyn CredentialAuthenticator>,
    ) -> Self {
        Self {
            config,
            session_config,
            authenticator,
        }
    }

    pub fn config(&self) -> &FormLoginConfig {
        &self.config
    }

    /// True for `POST <login_processing_url>`.
    pub fn is_login_request(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && path == self.config.login_processing_url
    }

    /// Reads the configured parameters and verifies them.
    ///
    /// Password hashing is CPU bound, so the check runs on the blocking pool.
    pub async fn attempt_authentication(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<User, FormLoginError> {
        let username = params
            .get(&self.config.username_parameter)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FormLoginError::MissingParameter(self.config.username_parameter.clone()))?;
        let password = params
            .get(&self.config.password_parameter)
            .cloned()
            .ok_or_else(|| FormLoginError::MissingParameter(self.config.password_parameter.clone()))?;

        let authenticator = Arc::clone(&self.authenticator);
        web::block(move || authenticator.authenticate(&username, &password))
            .await
            .map_err(|e| FormLoginError::Unavailable(e.to_string()))?
            .ok_or(FormLoginError::BadCredentials)
    }

    /// Runs the whole login for one submitted form and returns the redirect.
    pub async fn process(&self, session: &Session, params: &HashMap<String, String>) -> HttpResponse {
        let result = match self.attempt_authentication(params).await {
            Ok(user) => self.on_authentication_success(session, &user),
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Form login failed: {}", e);
                self.on_authentication_failure()
            }
        }
    }

    /// Stores the user and redirects to the success URL.
    pub fn on_authentication_success(
        &self,
        session: &Session,
        user: &User,
    ) -> Result<HttpResponse, FormLoginError> {
        SessionAuthenticator::login(session, user, &self.session_config)?;
        log::info!("User '{}' logged in with form login", user.get_username());

        Ok(redirect(SessionAuthenticator::success_redirect_url(
            session,
            &self.session_config,
            &self.config.default_success_url,
            self.config.always_use_default_success_url,
        )))
    }

    pub fn on_authentication_failure(&self) -> HttpResponse {
        redirect(self.config.get_failure_url())
    }
}

pub(crate) fn redirect(location: impl Into<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.into()))
        .finish()
}

// =============================================================================
// Form Login Error
// =============================================================================

#[derive(Debug, Display, Error)]
pub enum FormLoginError {
    #[display("missing form parameter '{_0}'")]
    MissingParameter(#[error(not(source))] String),
    #[display("bad credentials")]
    BadCredentials,
    #[display("credential check did not complete: {_0}")]
    Unavailable(#[error(not(source))] String),
    #[display("{_0}")]
    Session(SessionError),
}

impl From<SessionError> for FormLoginError {
    fn from(e: SessionError) -> Self {
        FormLoginError::Session(e)
    }
}
