//! HTTP Basic Authentication support.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.web.authentication.www.BasicAuthenticationFilter`
//!
//! Basic authentication is opt-in. When it is left disabled the
//! `Authorization: Basic` header is never inspected.

use actix_web::dev::ServiceRequest;
use actix_web::http;
use base64::prelude::*;

/// Decodes `Authorization: Basic <base64(username:password)>`.
pub fn decode_basic_credentials(req: &ServiceRequest) -> Option<(String, String)> {
    let auth_header = req.headers().get(http::header::AUTHORIZATION)?;
    let credentials = auth_header.to_str().ok()?.strip_prefix("Basic ")?;

    let decoded = BASE64_STANDARD.decode(credentials.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// HTTP Basic configuration.
///
/// # Spring Security Equivalent
/// `HttpSecurity.httpBasic()`
#[derive(Debug, Clone)]
pub struct HttpBasicConfig {
    realm: String,
    enabled: bool,
}

impl HttpBasicConfig {
    /// Default realm "Realm", as Spring's `BasicAuthenticationEntryPoint`.
    pub fn new() -> Self {
        HttpBasicConfig {
            realm: "Realm".to_string(),
            enabled: true,
        }
    }

    /// # Spring Equivalent
    /// `httpBasic(AbstractHttpConfigurer::disable)`
    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn realm(mut self, realm: &str) -> Self {
        self.realm = realm.to_string();
        self
    }

    pub fn www_authenticate_header(&self) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }
}

impl Default for HttpBasicConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn basic(value: &str) -> ServiceRequest {
        TestRequest::default()
            .insert_header((http::header::AUTHORIZATION, value))
            .to_srv_request()
    }

    #[test]
    fn test_decode_credentials() {
        let req = basic(&format!("Basic {}", BASE64_STANDARD.encode("admin:pa:ss")));
        assert_eq!(
            decode_basic_credentials(&req),
            Some(("admin".to_string(), "pa:ss".to_string()))
        );
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert!(decode_basic_credentials(&basic("Bearer abc")).is_none());
        assert!(decode_basic_credentials(&basic("Basic !!!")).is_none());
        assert!(decode_basic_credentials(&basic(&format!("Basic {}", BASE64_STANDARD.encode("nocolon")))).is_none());
        assert!(decode_basic_credentials(&TestRequest::default().to_srv_request()).is_none());
    }

    #[test]
    fn test_www_authenticate_header() {
        assert_eq!(HttpBasicConfig::new().www_authenticate_header(), "Basic realm=\"Realm\"");
        assert_eq!(
            HttpBasicConfig::new().realm("Parking").www_authenticate_header(),
            "Basic realm=\"Parking\""
        );
    }

    #[test]
    fn test_disable() {
        assert!(HttpBasicConfig::new().is_enabled());
        assert!(!HttpBasicConfig::new().disable().is_enabled());
    }
}
