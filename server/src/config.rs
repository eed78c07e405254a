//! Runtime settings read from the environment.
//!
//! The security policy itself is code (see [`crate::security_config`]); only
//! deployment details live here.

use std::env;

/// Client credentials of one OAuth2 provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Account seeded with role `ADMIN` at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

pub const SESSION_COOKIE: &str = "SESSION";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    /// Redis-backed sessions when set, signed cookie sessions otherwise.
    pub redis_url: Option<String>,
    /// At least 64 bytes; a random key is generated when absent.
    pub session_secret: Option<String>,
    pub cors_allowed_origin: String,
    /// Base of the OAuth2 redirect URIs, e.g. `http://localhost:8080`.
    pub public_base_url: String,
    pub naver: Option<ProviderCredentials>,
    pub google: Option<ProviderCredentials>,
    pub kakao: Option<ProviderCredentials>,
    pub admin: Option<AdminAccount>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            redis_url: None,
            session_secret: None,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            naver: None,
            google: None,
            kakao: None,
            admin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let provider = |prefix: &str| {
            Some(ProviderCredentials {
                client_id: var(&format!("{}_CLIENT_ID", prefix))?,
                client_secret: var(&format!("{}_CLIENT_SECRET", prefix))?,
            })
        };

        let defaults = Self::default();
        Self {
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            redis_url: var("REDIS_URL"),
            session_secret: var("SESSION_SECRET"),
            cors_allowed_origin: var("CORS_ALLOWED_ORIGIN").unwrap_or(defaults.cors_allowed_origin),
            public_base_url: var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            naver: provider("NAVER"),
            google: provider("GOOGLE"),
            kakao: provider("KAKAO"),
            admin: var("ADMIN_USERNAME").zip(var("ADMIN_PASSWORD")).map(|(username, password)| AdminAccount {
                username,
                password,
            }),
        }
    }
}
