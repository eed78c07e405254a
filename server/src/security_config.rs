//! The backend's security policy.
//!
//! # Spring Security Equivalent
//! The `@Configuration @EnableWebSecurity` class producing the
//! `BCryptPasswordEncoder`, `SecurityFilterChain` and
//! `CorsConfigurationSource` beans.
//!
//! | Path | Access |
//! |------|--------|
//! | `/login/**`, `/oauth2/**`, `/api/v1/join`, `/confirm` | anyone |
//! | `/api/v1/admin` | `ADMIN` |
//! | `/api/v1/my/**` | `ADMIN` or `USER` |
//! | everything else | authenticated |
//!
//! CSRF and HTTP Basic are disabled. Logout stays at its default `/logout`.

use parking_security_core::http::security::{
    BCryptPasswordEncoder, ClientRegistration, ClientRegistrationRepository, CorsConfig,
    HttpSecurity, InMemoryUserDetailsManager, OAuth2Client, OAuth2Error, OAuth2Provider, SecurityConfigError,
    SecurityFilterChain, UrlBasedCorsConfigurationSource,
};

use crate::config::{AppConfig, ProviderCredentials};
use crate::oauth2_user_service::CustomOAuth2UserService;

pub const LOGIN_PAGE: &str = "/login";
pub const LOGIN_PROCESSING_URL: &str = "/loginProc";
pub const DEFAULT_SUCCESS_URL: &str = "/api/v1/my";

pub struct SecurityConfig {
    users: InMemoryUserDetailsManager,
    clients: ClientRegistrationRepository,
    allowed_origin: String,
}

impl SecurityConfig {
    /// # Errors
    /// An OAuth2 client whose endpoints or redirect URI do not parse.
    pub fn new(config: &AppConfig, users: InMemoryUserDetailsManager) -> Result<Self, OAuth2Error> {
        let providers = [
            (OAuth2Provider::Naver, &config.naver),
            (OAuth2Provider::Google, &config.google),
            (OAuth2Provider::Kakao, &config.kakao),
        ];

        let mut clients = ClientRegistrationRepository::new();
        for (provider, credentials) in providers {
            if let Some(ProviderCredentials { client_id, client_secret }) = credentials {
                let registration = ClientRegistration::with_provider(provider, client_id, client_secret);
                clients = clients.with_client(OAuth2Client::new(registration, &config.public_base_url)?);
                log::info!("OAuth2 login enabled for {}", provider.client_name());
            }
        }

        Ok(Self {
            users,
            clients,
            allowed_origin: config.cors_allowed_origin.clone(),
        })
    }

    /// Adds a client next to the ones read from the environment.
    pub fn register_client(mut self, client: OAuth2Client) -> Self {
        log::info!("OAuth2 login enabled for {}", client.registration().get_client_name());
        self.clients = self.clients.with_client(client);
        self
    }

    /// # Spring Equivalent
    /// `new BCryptPasswordEncoder()`
    pub fn password_encoder() -> BCryptPasswordEncoder {
        BCryptPasswordEncoder::new()
    }

    pub fn users(&self) -> &InMemoryUserDetailsManager {
        &self.users
    }

    pub fn filter_chain(&self) -> Result<SecurityFilterChain, SecurityConfigError> {
        HttpSecurity::new()
            .cors(self.cors_configuration_source())
            .authorize_http_requests(|auth| {
                auth.request_matchers(&["/login/**", "/oauth2/**", "/api/v1/join", "/confirm"])
                    .permit_all()
                    .request_matchers(&["/api/v1/admin"])
                    .has_role("ADMIN")
                    .request_matchers(&["/api/v1/my/**"])
                    .has_any_role(&["ADMIN", "USER"])
                    .any_request()
                    .authenticated()
            })
            .form_login(|form| {
                form.login_page(LOGIN_PAGE)
                    .login_processing_url(LOGIN_PROCESSING_URL)
                    .default_success_url(DEFAULT_SUCCESS_URL, true)
                    .permit_all()
            })
            .oauth2_login(|oauth2| {
                oauth2
                    .login_page(LOGIN_PAGE)
                    .default_success_url(DEFAULT_SUCCESS_URL, true)
                    .client_registration_repository(self.clients.clone())
                    .user_service(CustomOAuth2UserService::new(self.users.clone()))
            })
            .csrf(|csrf| csrf.disable())
            .http_basic(|basic| basic.disable())
            .user_details_service(self.users.clone())
            .build()
    }

    pub fn cors_configuration_source(&self) -> UrlBasedCorsConfigurationSource {
        let configuration = CorsConfig::new()
            .allow_credentials(true)
            .add_allowed_origin(&self.allowed_origin)
            .add_allowed_header("*")
            .add_allowed_method("*");

        UrlBasedCorsConfigurationSource::new().register_cors_configuration("/**", configuration)
    }
}
