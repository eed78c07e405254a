//! Security policy builder.
//!
//! # Spring Security Equivalent
//! `HttpSecurity` and the `SecurityFilterChain` bean it builds.
//!
//! # Example
//! ```
//! use parking_security_core::http::security::authenticator::InMemoryUserDetailsManager;
//! use parking_security_core::http::security::HttpSecurity;
//!
//! let chain = HttpSecurity::new()
//!     .authorize_http_requests(|auth| {
//!         auth.request_matchers(&["/login/**", "/api/v1/join"]).permit_all()
//!             .request_matchers(&["/api/v1/admin"]).has_role("ADMIN")
//!             .any_request().authenticated()
//!     })
//!     .form_login(|form| {
//!         form.login_page("/login")
//!             .login_processing_url("/loginProc")
//!             .default_success_url("/api/v1/my", true)
//!             .permit_all()
//!     })
//!     .csrf(|csrf| csrf.disable())
//!     .user_details_service(InMemoryUserDetailsManager::plain_text())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(chain.login_page(), "/login");
//! ```

use std::sync::Arc;

use actix_cors::Cors;
use derive_more::{Display, Error};

use crate::http::security::authorizer::AuthorizeHttpRequests;
use crate::http::security::cors::UrlBasedCorsConfigurationSource;
use crate::http::security::csrf::CsrfConfig;
use crate::http::security::form_login::{FormLoginConfig, FormLoginHandler};
use crate::http::security::http_basic::HttpBasicConfig;
use crate::http::security::logout::{LogoutConfig, LogoutHandler};
use crate::http::security::oauth2::{OAuth2LoginConfig, OAuth2LoginHandler};
use crate::http::security::session::{CredentialAuthenticator, SessionAuthenticator, SessionConfig};

/// Invalid combinations detected by [`HttpSecurity::build`].
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum SecurityConfigError {
    #[display("{_0} requires a user details service")]
    MissingUserDetailsService(#[error(not(source))] &'static str),
    #[display("request rules declared after any_request() can never match")]
    RulesAfterAnyRequest,
}

/// # Spring Security Equivalent
/// `HttpSecurity`
pub struct HttpSecurity {
    authorize: AuthorizeHttpRequests,
    form_login: Option<FormLoginConfig>,
    oauth2_login: Option<OAuth2LoginConfig>,
    csrf: CsrfConfig,
    http_basic: Option<HttpBasicConfig>,
    logout: Option<LogoutConfig>,
    session: SessionConfig,
    cors: Option<UrlBasedCorsConfigurationSource>,
    user_details: Option<Arc<dyn CredentialAuthenticator>>,
}

impl Default for HttpSecurity {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSecurity {
    /// CSRF and logout on; everything else off until configured.
    pub fn new() -> Self {
        Self {
            authorize: AuthorizeHttpRequests::new(),
            form_login: None,
            oauth2_login: None,
            csrf: CsrfConfig::new(),
            http_basic: None,
            logout: Some(LogoutConfig::new()),
            session: SessionConfig::new(),
            cors: None,
            user_details: None,
        }
    }

    /// # Spring Equivalent
    /// `http.cors(withDefaults())` with a `CorsConfigurationSource` bean
    pub fn cors(mut self, source: UrlBasedCorsConfigurationSource) -> Self {
        self.cors = Some(source);
        self
    }

    /// # Spring Equivalent
    /// `http.authorizeHttpRequests(auth -> auth.requestMatchers(..).permitAll()..)`
    pub fn authorize_http_requests<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(AuthorizeHttpRequests) -> AuthorizeHttpRequests,
    {
        self.authorize = customizer(self.authorize);
        self
    }

    pub fn form_login<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(FormLoginConfig) -> FormLoginConfig,
    {
        self.form_login = Some(customizer(self.form_login.take().unwrap_or_default()));
        self
    }

    pub fn oauth2_login<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(OAuth2LoginConfig) -> OAuth2LoginConfig,
    {
        self.oauth2_login = Some(customizer(self.oauth2_login.take().unwrap_or_default()));
        self
    }

    /// # Spring Equivalent
    /// `http.csrf(AbstractHttpConfigurer::disable)` as `.csrf(|c| c.disable())`
    pub fn csrf<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(CsrfConfig) -> CsrfConfig,
    {
        self.csrf = customizer(self.csrf);
        self
    }

    /// Enables HTTP Basic unless the customizer calls `disable()`.
    ///
    /// # Spring Equivalent
    /// `http.httpBasic(withDefaults())`
    pub fn http_basic<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(HttpBasicConfig) -> HttpBasicConfig,
    {
        self.http_basic = Some(customizer(self.http_basic.take().unwrap_or_default()));
        self
    }

    pub fn logout<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(LogoutConfig) -> LogoutConfig,
    {
        self.logout = Some(customizer(self.logout.take().unwrap_or_default()));
        self
    }

    /// # Spring Equivalent
    /// `http.logout(AbstractHttpConfigurer::disable)`
    pub fn logout_disable(mut self) -> Self {
        self.logout = None;
        self
    }

    pub fn session_management<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(SessionConfig) -> SessionConfig,
    {
        self.session = customizer(self.session);
        self
    }

    /// Credential source for form login and HTTP Basic.
    ///
    /// # Spring Equivalent
    /// a `UserDetailsService` bean
    pub fn user_details_service<A: CredentialAuthenticator + 'static>(mut self, authenticator: A) -> Self {
        self.user_details = Some(Arc::new(authenticator));
        self
    }

    pub fn build(mut self) -> Result<SecurityFilterChain, SecurityConfigError> {
        if self.authorize.has_unreachable_rules() {
            return Err(SecurityConfigError::RulesAfterAnyRequest);
        }

        let form_login = match self.form_login.take() {
            Some(config) => {
                let authenticator = self
                    .user_details
                    .clone()
                    .ok_or(SecurityConfigError::MissingUserDetailsService("form login"))?;
                if config.is_permit_all() {
                    self.authorize.permit_first(&config.permitted_paths());
                }
                Some(FormLoginHandler::new(config, self.session.clone(), authenticator))
            }
            None => None,
        };

        let basic = match self.http_basic.take().filter(HttpBasicConfig::is_enabled) {
            Some(config) => {
                let authenticator = self
                    .user_details
                    .clone()
                    .ok_or(SecurityConfigError::MissingUserDetailsService("http basic"))?;
                Some((config, authenticator))
            }
            None => None,
        };

        let login_page = form_login
            .as_ref()
            .map(|f| f.config().get_login_page().to_string())
            .or_else(|| self.oauth2_login.as_ref().map(|o| o.get_login_page().to_string()));

        let oauth2_login = self
            .oauth2_login
            .take()
            .map(|config| OAuth2LoginHandler::new(config, self.session.clone()));

        let logout = self.logout.take().map(|config| {
            LogoutHandler::new(
                &config,
                login_page.as_deref().unwrap_or("/login"),
                self.csrf.is_enabled(),
                self.session.clone(),
            )
        });

        let entry_point = match (&basic, &login_page) {
            (Some((config, _)), _) => EntryPoint::Basic(config.www_authenticate_header()),
            (None, Some(page)) => EntryPoint::LoginRedirect(page.clone()),
            (None, None) => EntryPoint::Forbidden,
        };

        Ok(SecurityFilterChain {
            inner: Arc::new(ChainInner {
                authorizer: self.authorize,
                session_authenticator: SessionAuthenticator::new(self.session.clone()),
                session: self.session,
                form_login,
                oauth2_login,
                logout,
                basic,
                csrf: self.csrf,
                entry_point,
            }),
            cors: self.cors,
        })
    }
}

/// What an unauthenticated request on a protected path receives.
///
/// # Spring Equivalent
/// `AuthenticationEntryPoint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// `401` with the given `WWW-Authenticate` value.
    Basic(String),
    /// `302` to the login page; the original request is saved in the session.
    LoginRedirect(String),
    /// `403`, when no login mechanism is configured.
    Forbidden,
}

pub(crate) struct ChainInner {
    pub(crate) authorizer: AuthorizeHttpRequests,
    pub(crate) session_authenticator: SessionAuthenticator,
    pub(crate) session: SessionConfig,
    pub(crate) form_login: Option<FormLoginHandler>,
    pub(crate) oauth2_login: Option<OAuth2LoginHandler>,
    pub(crate) logout: Option<LogoutHandler>,
    pub(crate) basic: Option<(HttpBasicConfig, Arc<dyn CredentialAuthenticator>)>,
    pub(crate) csrf: CsrfConfig,
    pub(crate) entry_point: EntryPoint,
}

/// The built policy; wrap an `App` with it.
///
/// Cloning is cheap. `SessionMiddleware` must wrap outside this middleware
/// and [`cors`](Self::cors) outside that.
///
/// ```ignore
/// App::new()
///     .wrap(chain.clone())
///     .wrap(SessionMiddleware::new(store, key))
///     .wrap(chain.cors().unwrap())
/// ```
#[derive(Clone)]
pub struct SecurityFilterChain {
    pub(crate) inner: Arc<ChainInner>,
    cors: Option<UrlBasedCorsConfigurationSource>,
}

impl SecurityFilterChain {
    /// A fresh CORS middleware for the registered policy.
    pub fn cors(&self) -> Option<Cors> {
        self.cors.clone().map(UrlBasedCorsConfigurationSource::into_cors)
    }

    pub fn cors_configuration_source(&self) -> Option<&UrlBasedCorsConfigurationSource> {
        self.cors.as_ref()
    }

    pub fn authorizer(&self) -> &AuthorizeHttpRequests {
        &self.inner.authorizer
    }

    pub fn entry_point(&self) -> &EntryPoint {
        &self.inner.entry_point
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.session
    }

    pub fn login_page(&self) -> &str {
        match &self.inner.entry_point {
            EntryPoint::LoginRedirect(page) => page,
            _ => "/login",
        }
    }

    pub fn is_csrf_enabled(&self) -> bool {
        self.inner.csrf.is_enabled()
    }

    pub fn is_http_basic_enabled(&self) -> bool {
        self.inner.basic.is_some()
    }

    pub fn oauth2_login(&self) -> Option<&OAuth2LoginHandler> {
        self.inner.oauth2_login.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::authenticator::InMemoryUserDetailsManager;
    use crate::http::security::authorizer::AuthorizationDecision;

    #[test]
    fn test_form_login_requires_user_details() {
        let result = HttpSecurity::new().form_login(|f| f).build();
        assert!(matches!(
            result,
            Err(SecurityConfigError::MissingUserDetailsService("form login"))
        ));
    }

    #[test]
    fn test_http_basic_requires_user_details() {
        let result = HttpSecurity::new().http_basic(|b| b).build();
        assert!(matches!(
            result,
            Err(SecurityConfigError::MissingUserDetailsService("http basic"))
        ));
    }

    #[test]
    fn test_rules_after_any_request_rejected() {
        let result = HttpSecurity::new()
            .authorize_http_requests(|a| {
                a.any_request()
                    .authenticated()
                    .request_matchers(&["/late"])
                    .permit_all()
            })
            .build();
        assert!(matches!(result, Err(SecurityConfigError::RulesAfterAnyRequest)));
    }

    #[test]
    fn test_form_login_permit_all_opens_login_paths() {
        let chain = HttpSecurity::new()
            .authorize_http_requests(|a| a.any_request().authenticated())
            .form_login(|f| f.login_processing_url("/loginProc").permit_all())
            .user_details_service(InMemoryUserDetailsManager::plain_text())
            .build()
            .unwrap();

        assert!(chain.authorizer().decide("/login", None).is_granted());
        assert!(chain.authorizer().decide("/loginProc", None).is_granted());
        assert_eq!(
            chain.authorizer().decide("/api/v1/my", None),
            AuthorizationDecision::Unauthenticated
        );
    }

    #[test]
    fn test_entry_point_selection() {
        let users = InMemoryUserDetailsManager::plain_text();

        let basic = HttpSecurity::new()
            .form_login(|f| f)
            .http_basic(|b| b.realm("Parking"))
            .user_details_service(users.clone())
            .build()
            .unwrap();
        assert_eq!(basic.entry_point(), &EntryPoint::Basic("Basic realm=\"Parking\"".into()));

        let form = HttpSecurity::new()
            .form_login(|f| f.login_page("/signin"))
            .user_details_service(users)
            .build()
            .unwrap();
        assert_eq!(form.entry_point(), &EntryPoint::LoginRedirect("/signin".into()));

        let oauth2 = HttpSecurity::new().oauth2_login(|o| o.login_page("/login")).build().unwrap();
        assert_eq!(oauth2.entry_point(), &EntryPoint::LoginRedirect("/login".into()));

        let bare = HttpSecurity::new().build().unwrap();
        assert_eq!(bare.entry_point(), &EntryPoint::Forbidden);
    }

    #[test]
    fn test_toggles() {
        let chain = HttpSecurity::new()
            .csrf(|c| c.disable())
            .http_basic(|b| b.disable())
            .build()
            .unwrap();
        assert!(!chain.is_csrf_enabled());
        assert!(!chain.is_http_basic_enabled());
        assert!(chain.cors().is_none());

        assert!(HttpSecurity::new().build().unwrap().is_csrf_enabled());
    }
}
