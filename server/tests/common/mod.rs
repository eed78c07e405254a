//! Common test utilities and configuration.
//!
//! This module provides shared test infrastructure including:
//! - Test user store
//! - Test app builder (`parking_app!`)
//! - Helper functions

#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::LOCATION;
use actix_web::test;
use base64::prelude::*;

use honors_parking_server::config::{AppConfig, SESSION_COOKIE};
use honors_parking_server::handlers::public::SocialLogins;
use honors_parking_server::security_config::SecurityConfig;
use parking_security_core::http::security::{
    BCryptPasswordEncoder, InMemoryUserDetailsManager, PasswordEncoder, SecurityFilterChain,
    UrlBasedCorsConfigurationSource, User,
};

pub const FRONTEND_ORIGIN: &str = "http://localhost:3000";

/// Creates a user store with predefined users.
///
/// Users:
/// - admin/admin: ADMIN, USER roles
/// - user/user: USER role
/// - guest/guest: GUEST role
pub fn test_users() -> InMemoryUserDetailsManager {
    let encoder = BCryptPasswordEncoder::with_cost(4);
    let user = |name: &str, roles: &[&str]| {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        User::with_encoded_password(name, encoder.encode(name).unwrap()).roles(&roles)
    };

    InMemoryUserDetailsManager::new(encoder.clone())
        .with_user(user("admin", &["ADMIN", "USER"]))
        .with_user(user("user", &["USER"]))
        .with_user(user("guest", &["GUEST"]))
}

/// Everything the app factory needs, built from one configuration.
pub struct TestContext {
    pub chain: SecurityFilterChain,
    pub cors_source: UrlBasedCorsConfigurationSource,
    pub users: InMemoryUserDetailsManager,
    pub social: SocialLogins,
}

pub fn context_with(config: AppConfig) -> TestContext {
    context_for(SecurityConfig::new(&config, test_users()).unwrap())
}

pub fn context_for(security: SecurityConfig) -> TestContext {
    let chain = security.filter_chain().unwrap();
    TestContext {
        social: SocialLogins::from_chain(&chain),
        cors_source: security.cors_configuration_source(),
        users: security.users().clone(),
        chain,
    }
}

pub fn context() -> TestContext {
    context_with(AppConfig::default())
}

/// Builds the app with the same middleware order as `main`.
macro_rules! parking_app {
    ($ctx:expr) => {{
        let ctx: &common::TestContext = &$ctx;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(ctx.chain.clone())
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::generate(),
                    )
                    .cookie_name(honors_parking_server::config::SESSION_COOKIE.to_string())
                    .cookie_secure(false)
                    .build(),
                )
                .wrap(ctx.cors_source.clone().into_cors())
                .app_data(actix_web::web::Data::new(ctx.users.clone()))
                .app_data(actix_web::web::Data::new(ctx.social.clone()))
                .configure(honors_parking_server::handlers::configure),
        )
        .await
    }};
}

pub fn login_form(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/loginProc")
        .set_form([("username", username), ("password", password)])
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64_STANDARD.encode(format!("{}:{}", username, password)))
}

pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
        .expect("response should set the session cookie")
}

pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
