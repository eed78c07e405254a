//! Security module providing authentication and authorization.
//!
//! # Spring Equivalent
//! `org.springframework.security` package
//!
//! # Module Structure
//!
//! - `http_security` - Policy builder (HttpSecurity) and the built SecurityFilterChain
//! - `middleware` - Actix middleware service enforcing a SecurityFilterChain
//! - `authorizer` - URL authorization rules (AuthorizeHttpRequests)
//! - `ant_matcher` - Ant-style URL pattern matching
//! - `authenticator` - In-memory user store (InMemoryUserDetailsManager)
//! - `crypto` - Password encoding (BCrypt, NoOp)
//! - `session` - Session-based authentication and fixation protection
//! - `form_login` - Username/password form login
//! - `oauth2` - OAuth2 authorization code login (Google, Naver, Kakao, ...)
//! - `logout` - Logout endpoint
//! - `csrf` - CSRF token protection
//! - `http_basic` - HTTP Basic Authentication
//! - `cors` - Cross-origin policy (UrlBasedCorsConfigurationSource)
//! - `extractor` - Actix Web extractors (AuthenticatedUser, OptionalUser)
//! - `config` - Core traits (Authenticator, Authorizer)
//! - `user` - User model

// Re-exports for convenience
pub use authenticator::{InMemoryUserDetailsManager, UserStoreError};
pub use authorizer::{Access, AuthorizationDecision, AuthorizeHttpRequests};
pub use config::{Authenticator, Authorizer};
pub use cors::{CorsConfig, UrlBasedCorsConfigurationSource};
pub use crypto::{BCryptPasswordEncoder, CryptoError, NoOpPasswordEncoder, PasswordEncoder};
pub use csrf::{CsrfConfig, CsrfError, CsrfToken, CsrfTokenRepository, SessionCsrfTokenRepository};
pub use extractor::{AuthenticatedUser, OptionalUser, SecurityExt};
pub use form_login::{FormLoginConfig, FormLoginError, FormLoginHandler};
pub use http_basic::HttpBasicConfig;
pub use http_security::{EntryPoint, HttpSecurity, SecurityConfigError, SecurityFilterChain};
pub use logout::{LogoutConfig, LogoutHandler};
pub use oauth2::{
    ClientRegistration, ClientRegistrationRepository, DefaultOAuth2UserService, OAuth2Client,
    OAuth2Error, OAuth2LoginConfig, OAuth2Provider, OAuth2UserRequest, OAuth2UserService,
};
pub use session::{
    CredentialAuthenticator, SessionAuthenticator, SessionConfig, SessionError,
    SessionFixationStrategy, SessionUser,
};
pub use user::User;

// Internal modules (private implementation details)
mod config;
mod extractor;
mod user;

// Public modules
pub mod ant_matcher;
pub mod authenticator;
pub mod authorizer;
pub mod cors;
pub mod crypto;
pub mod csrf;
pub mod form_login;
pub mod http_basic;
pub mod http_security;
pub mod logout;
pub mod middleware;
pub mod oauth2;
pub mod session;
