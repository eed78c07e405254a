//! Cross-origin policy.
//!
//! # Spring Security Equivalent
//! `CorsConfiguration` + `UrlBasedCorsConfigurationSource` consumed by `cors(withDefaults())`
//!
//! The policy is declared here and turned into an `actix_cors::Cors`
//! middleware, which answers preflight requests and adds the
//! `Access-Control-*` headers. Requests from an origin that is not allowed
//! are rejected with `400` and carry no `Access-Control-Allow-Origin`.
//!
//! # Example
//! ```
//! use parking_security_core::http::security::cors::{CorsConfig, UrlBasedCorsConfigurationSource};
//!
//! let config = CorsConfig::new()
//!     .allow_credentials(true)
//!     .add_allowed_origin("http://localhost:3000")
//!     .add_allowed_header("*")
//!     .add_allowed_method("*");
//!
//! let source = UrlBasedCorsConfigurationSource::new().register_cors_configuration("/**", config);
//! assert!(source.get_cors_configuration("/api/v1/my").unwrap().check_origin("http://localhost:3000"));
//! let _cors = source.into_cors();
//! ```

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header::HeaderName;
use actix_web::http::Method;

use crate::http::security::ant_matcher::AntMatcher;

const ALL: &str = "*";

/// # Spring Security Equivalent
/// `org.springframework.web.cors.CorsConfiguration`
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    allowed_origins: Vec<String>,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<String>,
    exposed_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<usize>,
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Exact origin such as `http://localhost:3000`, or `*`.
    pub fn add_allowed_origin(mut self, origin: &str) -> Self {
        push_unique(&mut self.allowed_origins, origin.trim_end_matches('/'));
        self
    }

    /// Header name, or `*` for any.
    pub fn add_allowed_header(mut self, header: &str) -> Self {
        if header == ALL || HeaderName::try_from(header).is_ok() {
            push_unique(&mut self.allowed_headers, header);
        } else {
            log::warn!("Ignoring invalid CORS header name '{}'", header);
        }
        self
    }

    /// Method name, or `*` for any.
    pub fn add_allowed_method(mut self, method: &str) -> Self {
        if method == ALL || Method::from_bytes(method.as_bytes()).is_ok() {
            push_unique(&mut self.allowed_methods, &method.to_ascii_uppercase());
        } else {
            log::warn!("Ignoring invalid CORS method '{}'", method);
        }
        self
    }

    pub fn add_exposed_header(mut self, header: &str) -> Self {
        if HeaderName::try_from(header).is_ok() {
            push_unique(&mut self.exposed_headers, header);
        }
        self
    }

    /// Preflight cache duration in seconds.
    pub fn max_age(mut self, seconds: usize) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn get_allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn is_allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn allows_any_header(&self) -> bool {
        self.allowed_headers.iter().any(|h| h == ALL)
    }

    pub fn allows_any_method(&self) -> bool {
        self.allowed_methods.iter().any(|m| m == ALL)
    }

    pub fn check_origin(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == ALL || allowed.eq_ignore_ascii_case(origin))
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// CORS configurations keyed by path pattern; the first matching pattern applies.
///
/// # Spring Security Equivalent
/// `UrlBasedCorsConfigurationSource`
#[derive(Debug, Clone, Default)]
pub struct UrlBasedCorsConfigurationSource {
    configurations: Vec<(AntMatcher, CorsConfig)>,
}

impl UrlBasedCorsConfigurationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cors_configuration(mut self, pattern: &str, config: CorsConfig) -> Self {
        self.configurations.push((AntMatcher::new(pattern), config));
        self
    }

    pub fn get_cors_configuration(&self, path: &str) -> Option<&CorsConfig> {
        self.configurations
            .iter()
            .find(|(matcher, _)| matcher.matches(path))
            .map(|(_, config)| config)
    }

    /// Builds the actix middleware.
    ///
    /// Origins are checked against the configuration registered for the
    /// request path. Headers, methods, credentials and max-age are the union
    /// over all registered configurations, since `actix-cors` keeps them global.
    pub fn into_cors(self) -> Cors {
        let configs: Vec<&CorsConfig> = self.configurations.iter().map(|(_, c)| c).collect();

        let mut cors = Cors::default();

        if configs.iter().any(|c| c.allows_any_header()) {
            cors = cors.allow_any_header();
        } else {
            let headers: Vec<HeaderName> = configs
                .iter()
                .flat_map(|c| c.allowed_headers.iter())
                .filter_map(|h| HeaderName::try_from(h.as_str()).ok())
                .collect();
            if !headers.is_empty() {
                cors = cors.allowed_headers(headers);
            }
        }

        if configs.iter().any(|c| c.allows_any_method()) {
            cors = cors.allow_any_method();
        } else {
            let methods: Vec<Method> = configs
                .iter()
                .flat_map(|c| c.allowed_methods.iter())
                .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
                .collect();
            if !methods.is_empty() {
                cors = cors.allowed_methods(methods);
            }
        }

        let exposed: Vec<HeaderName> = configs
            .iter()
            .flat_map(|c| c.exposed_headers.iter())
            .filter_map(|h| HeaderName::try_from(h.as_str()).ok())
            .collect();
        if !exposed.is_empty() {
            cors = cors.expose_headers(exposed);
        }

        if configs.iter().any(|c| c.allow_credentials) {
            cors = cors.supports_credentials();
        }

        if let Some(max_age) = configs.iter().filter_map(|c| c.max_age).max() {
            cors = cors.max_age(max_age);
        }

        let source = Arc::new(self);
        cors.block_on_origin_mismatch(true).allowed_origin_fn(move |origin, req_head| {
            let Ok(origin) = origin.to_str() else {
                return false;
            };
            let allowed = source
                .get_cors_configuration(req_head.uri.path())
                .is_some_and(|config| config.check_origin(origin));
            if !allowed {
                log::debug!("CORS origin '{}' rejected for {}", origin, req_head.uri.path());
            }
            allowed
        })
    }
}
