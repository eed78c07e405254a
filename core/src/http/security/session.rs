//! Session-based Authentication.
//!
//! # Spring Security Equivalent
//! `HttpSessionSecurityContextRepository` together with `sessionManagement()`.
//!
//! The authenticated principal lives in the `actix-session` state. Which store
//! backs it (signed cookie, Redis) is chosen where `SessionMiddleware` is built;
//! this module only reads and writes keys.
//!
//! # Example
//! ```rust,ignore
//! use parking_security_core::http::security::session::{SessionAuthenticator, SessionConfig};
//!
//! async fn after_login(session: Session, user: AuthenticatedUser) -> impl Responder {
//!     SessionAuthenticator::login(&session, &user, &SessionConfig::default())?;
//!     HttpResponse::Ok().finish()
//! }
//! ```

use actix_session::{Session, SessionExt};
use actix_web::dev::ServiceRequest;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::http::security::config::Authenticator;
use crate::http::security::User;

// =============================================================================
// Session Fixation Strategy
// =============================================================================

/// What happens to the session identifier when a user logs in.
///
/// # Spring Security Equivalent
/// `sessionManagement().sessionFixation()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFixationStrategy {
    /// New identifier, attributes kept.
    ///
    /// # Spring Equivalent
    /// `migrateSession()` / `changeSessionId()`
    #[default]
    MigrateSession,

    /// New identifier, attributes dropped.
    ///
    /// # Spring Equivalent
    /// `newSession()`
    NewSession,

    /// Identifier kept. Tests only.
    ///
    /// # Spring Equivalent
    /// `none()`
    None,
}

// =============================================================================
// Session User Data
// =============================================================================

/// Serializable principal stored in the session.
///
/// Kept separate from `User` so the password hash is never written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub roles: Vec<String>,
    #[serde(default)]
    pub authorities: Vec<String>,
}

impl SessionUser {
    pub fn from_user(user: &User) -> Self {
        let display_name = match user.get_display_name() {
            name if name == user.get_username() => None,
            name => Some(name.to_string()),
        };
        Self {
            username: user.get_username().to_string(),
            display_name,
            roles: user.get_roles().to_vec(),
            authorities: user.get_authorities().to_vec(),
        }
    }

    pub fn to_user(&self) -> User {
        let user = User::without_password(&self.username)
            .roles(&self.roles)
            .authorities(&self.authorities);
        match &self.display_name {
            Some(name) => user.display_name(name.clone()),
            None => user,
        }
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self::from_user(user)
    }
}

impl From<SessionUser> for User {
    fn from(session_user: SessionUser) -> Self {
        session_user.to_user()
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Session keys and fixation policy.
///
/// # Spring Security Equivalent
/// `SessionManagementConfigurer`
///
/// Concurrent-session limits are not modelled: every login may hold its own
/// session, which is also what an unconfigured `maximumSessions` means.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    user_key: String,
    saved_request_key: String,
    fixation_strategy: SessionFixationStrategy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            user_key: "SPRING_SECURITY_CONTEXT".to_string(),
            saved_request_key: "SPRING_SECURITY_SAVED_REQUEST".to_string(),
            fixation_strategy: SessionFixationStrategy::MigrateSession,
        }
    }

    pub fn user_key(mut self, key: &str) -> Self {
        self.user_key = key.to_string();
        self
    }

    pub fn saved_request_key(mut self, key: &str) -> Self {
        self.saved_request_key = key.to_string();
        self
    }

    /// # Spring Equivalent
    /// `sessionManagement().sessionFixation().migrateSession()`
    pub fn fixation_strategy(mut self, strategy: SessionFixationStrategy) -> Self {
        self.fixation_strategy = strategy;
        self
    }

    pub fn get_user_key(&self) -> &str {
        &self.user_key
    }

    pub fn get_saved_request_key(&self) -> &str {
        &self.saved_request_key
    }

    pub fn get_fixation_strategy(&self) -> SessionFixationStrategy {
        self.fixation_strategy
    }
}

// =============================================================================
// Session Authenticator
// =============================================================================

/// Reads the principal from the session and manages login/logout state.
///
/// # Requirements
/// `SessionMiddleware` must wrap the security middleware.
#[derive(Debug, Clone, Default)]
pub struct SessionAuthenticator {
    config: SessionConfig,
}

impl SessionAuthenticator {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Stores the user in the session after applying fixation protection.
    pub fn login(session: &Session, user: &User, config: &SessionConfig) -> Result<(), SessionError> {
        Self::apply_fixation_protection(session, config);

        session
            .insert(&config.user_key, SessionUser::from_user(user))
            .map_err(|e| SessionError::Insert(e.to_string()))
    }

    fn apply_fixation_protection(session: &Session, config: &SessionConfig) {
        match config.fixation_strategy {
            SessionFixationStrategy::MigrateSession => session.renew(),
            SessionFixationStrategy::NewSession => {
                // purge() would discard the insert that follows; clear then renew instead
                session.clear();
                session.renew();
            }
            SessionFixationStrategy::None => {}
        }
    }

    /// Invalidates the session.
    ///
    /// # Spring Equivalent
    /// `SecurityContextLogoutHandler` with `invalidateHttpSession(true)`
    pub fn logout(session: &Session) {
        session.purge();
    }

    /// Removes only the principal, keeping other attributes.
    pub fn clear_authentication(session: &Session, config: &SessionConfig) {
        session.remove(&config.user_key);
    }

    pub fn is_authenticated(session: &Session, config: &SessionConfig) -> bool {
        Self::get_session_user(session, config).is_some()
    }

    pub fn get_session_user(session: &Session, config: &SessionConfig) -> Option<User> {
        match session.get::<SessionUser>(&config.user_key) {
            Ok(user) => user.map(User::from),
            Err(e) => {
                log::warn!("Discarding unreadable session principal: {}", e);
                None
            }
        }
    }

    /// Remembers the URL an anonymous user asked for.
    ///
    /// # Spring Equivalent
    /// `HttpSessionRequestCache.saveRequest`
    pub fn save_request(session: &Session, url: &str, config: &SessionConfig) -> Result<(), SessionError> {
        session
            .insert(&config.saved_request_key, url)
            .map_err(|e| SessionError::Insert(e.to_string()))
    }

    /// Takes the saved URL out of the session, falling back to `default_url`.
    pub fn get_saved_request(session: &Session, config: &SessionConfig, default_url: &str) -> String {
        session
            .remove_as::<String>(&config.saved_request_key)
            .and_then(Result::ok)
            .unwrap_or_else(|| default_url.to_string())
    }

    /// Target of the post-login redirect.
    ///
    /// The saved request is always consumed; with `always_use_default` it is discarded.
    ///
    /// # Spring Equivalent
    /// `SavedRequestAwareAuthenticationSuccessHandler`
    pub fn success_redirect_url(
        session: &Session,
        config: &SessionConfig,
        default_url: &str,
        always_use_default: bool,
    ) -> String {
        let saved = Self::get_saved_request(session, config, default_url);
        if always_use_default {
            default_url.to_string()
        } else {
            saved
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Authenticator for SessionAuthenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<User> {
        Self::get_session_user(&req.get_session(), &self.config)
    }
}

// =============================================================================
// Credential Authenticator Trait
// =============================================================================

/// Validates a username/password pair.
///
/// # Spring Equivalent
/// `DaoAuthenticationProvider` backed by a `UserDetailsService`
///
/// Used by form login and HTTP Basic; separate from `Authenticator` because it
/// checks submitted credentials instead of reading state from the request.
pub trait CredentialAuthenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<User>;
}

// =============================================================================
// Session Error
// =============================================================================

#[derive(Debug, Display, Error)]
pub enum SessionError {
    #[display("Session insert error: {_0}")]
    Insert(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn test_user() -> User {
        User::new("driver".to_string(), "$2b$10$hash".to_string())
            .roles(&["USER".into()])
            .authorities(&["parking:reserve".into()])
            .display_name("Park Driver")
    }

    #[test]
    fn test_session_user_conversion() {
        let session_user = SessionUser::from_user(&test_user());

        assert_eq!(session_user.username, "driver");
        assert_eq!(session_user.display_name.as_deref(), Some("Park Driver"));

        let restored = session_user.to_user();
        assert_eq!(restored.get_username(), "driver");
        assert_eq!(restored.get_password(), "");
        assert!(restored.has_role("USER"));
        assert!(restored.has_authority("parking:reserve"));
        assert_eq!(restored.get_display_name(), "Park Driver");
    }

    #[test]
    fn test_session_user_serialization_omits_password() {
        let json = serde_json::to_string(&SessionUser::from_user(&test_user())).unwrap();
        assert!(json.contains("driver"));
        assert!(!json.contains("$2b$"));

        let plain: SessionUser = serde_json::from_str(r#"{"username":"a","roles":["USER"]}"#).unwrap();
        assert!(plain.authorities.is_empty());
        assert!(plain.display_name.is_none());
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.get_fixation_strategy(), SessionFixationStrategy::MigrateSession);
        assert_eq!(config.get_user_key(), "SPRING_SECURITY_CONTEXT");

        let config = config
            .user_key("principal")
            .saved_request_key("saved")
            .fixation_strategy(SessionFixationStrategy::NewSession);
        assert_eq!(config.get_user_key(), "principal");
        assert_eq!(config.get_saved_request_key(), "saved");
        assert_eq!(config.get_fixation_strategy(), SessionFixationStrategy::NewSession);
    }

    #[test]
    fn test_login_and_read_back() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let config = SessionConfig::default();

        assert!(!SessionAuthenticator::is_authenticated(&session, &config));
        SessionAuthenticator::login(&session, &test_user(), &config).unwrap();

        let user = SessionAuthenticator::new(config.clone()).get_user(&req).unwrap();
        assert_eq!(user.get_username(), "driver");
        assert!(SessionAuthenticator::is_authenticated(&session, &config));
    }

    #[test]
    fn test_new_session_strategy_drops_other_attributes() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let config = SessionConfig::default().fixation_strategy(SessionFixationStrategy::NewSession);

        session.insert("cart", "A-12").unwrap();
        SessionAuthenticator::login(&session, &test_user(), &config).unwrap();

        assert!(session.get::<String>("cart").unwrap().is_none());
        assert!(SessionAuthenticator::is_authenticated(&session, &config));
    }

    #[test]
    fn test_saved_request_is_consumed() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let config = SessionConfig::default();

        SessionAuthenticator::save_request(&session, "/api/v1/my/profile", &config).unwrap();
        assert_eq!(
            SessionAuthenticator::get_saved_request(&session, &config, "/"),
            "/api/v1/my/profile"
        );
        assert_eq!(SessionAuthenticator::get_saved_request(&session, &config, "/"), "/");
    }

    #[test]
    fn test_clear_authentication() {
        let req = TestRequest::default().to_srv_request();
        let session = req.get_session();
        let config = SessionConfig::default();

        SessionAuthenticator::login(&session, &test_user(), &config).unwrap();
        SessionAuthenticator::clear_authentication(&session, &config);
        assert!(!SessionAuthenticator::is_authenticated(&session, &config));
    }
}
