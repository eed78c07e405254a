//! OAuth2 Login.
//!
//! # Spring Security Equivalent
//! `oauth2Login()` with `OAuth2AuthorizationRequestRedirectFilter`,
//! `OAuth2LoginAuthenticationFilter` and a custom `OAuth2UserService`.
//!
//! The protocol itself is delegated to the `oauth2` crate and the userinfo
//! call to `reqwest`. This module holds the client registrations, the
//! per-session authorization state and the mapping from provider attributes
//! to an application [`User`].
//!
//! # Flow
//!
//! 1. `GET /oauth2/authorization/{registrationId}`: state (and PKCE verifier)
//!    is stored in the session and the browser is sent to the provider.
//! 2. `GET /login/oauth2/code/{registrationId}?code=..&state=..`: the state is
//!    checked, the code exchanged, the userinfo endpoint queried and the
//!    [`OAuth2UserService`] turns the attributes into a [`User`] which is
//!    stored in the session.
//!
//! # Spring Security Comparison
//!
//! | Spring Security | Here |
//! |-----------------|------|
//! | `ClientRegistration` | [`ClientRegistration`] |
//! | `ClientRegistrationRepository` | [`ClientRegistrationRepository`] |
//! | `OAuth2UserService` | [`OAuth2UserService`] |
//! | `DefaultOAuth2UserService` | [`DefaultOAuth2UserService`] |

use std::collections::BTreeMap;
use std::sync::Arc;

use actix_session::Session;
use actix_web::HttpResponse;
use async_trait::async_trait;
use derive_more::{Display, Error};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::http::security::ant_matcher::AntMatcher;
use crate::http::security::form_login::redirect;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};
use crate::http::security::user::User;

/// Provider attributes as returned by the userinfo endpoint.
pub type OAuth2Attributes = Map<String, Value>;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum OAuth2Error {
    #[display("Configuration error: {_0}")]
    Configuration(#[error(not(source))] String),
    #[display("Unknown client registration: {_0}")]
    UnknownRegistration(#[error(not(source))] String),
    #[display("Invalid state parameter")]
    InvalidState,
    #[display("Authorization denied: {_0}")]
    AuthorizationDenied(#[error(not(source))] String),
    #[display("Token exchange error: {_0}")]
    TokenExchange(#[error(not(source))] String),
    #[display("User info error: {_0}")]
    UserInfo(#[error(not(source))] String),
    #[display("Session error: {_0}")]
    Session(#[error(not(source))] String),
    #[display("Account conflict: {_0}")]
    AccountConflict(#[error(not(source))] String),
}

// =============================================================================
// Providers
// =============================================================================

/// Providers with built-in endpoint defaults.
///
/// # Spring Equivalent
/// `CommonOAuth2Provider` plus the `spring.security.oauth2.client.provider.*`
/// entries usually added for Naver and Kakao.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OAuth2Provider {
    Google,
    Naver,
    Kakao,
    GitHub,
    /// Every endpoint must be configured on the registration.
    Custom,
}

impl OAuth2Provider {
    pub const ALL: [OAuth2Provider; 5] = [
        OAuth2Provider::Google,
        OAuth2Provider::Naver,
        OAuth2Provider::Kakao,
        OAuth2Provider::GitHub,
        OAuth2Provider::Custom,
    ];

    pub fn registration_id(&self) -> &'static str {
        match self {
            OAuth2Provider::Google => "google",
            OAuth2Provider::Naver => "naver",
            OAuth2Provider::Kakao => "kakao",
            OAuth2Provider::GitHub => "github",
            OAuth2Provider::Custom => "custom",
        }
    }

    pub fn client_name(&self) -> &'static str {
        match self {
            OAuth2Provider::Google => "Google",
            OAuth2Provider::Naver => "Naver",
            OAuth2Provider::Kakao => "Kakao",
            OAuth2Provider::GitHub => "GitHub",
            OAuth2Provider::Custom => "Custom",
        }
    }

    pub fn auth_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://accounts.google.com/o/oauth2/v2/auth"),
            OAuth2Provider::Naver => Some("https://nid.naver.com/oauth2.0/authorize"),
            OAuth2Provider::Kakao => Some("https://kauth.kakao.com/oauth/authorize"),
            OAuth2Provider::GitHub => Some("https://github.com/login/oauth/authorize"),
            OAuth2Provider::Custom => None,
        }
    }

    pub fn token_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://oauth2.googleapis.com/token"),
            OAuth2Provider::Naver => Some("https://nid.naver.com/oauth2.0/token"),
            OAuth2Provider::Kakao => Some("https://kauth.kakao.com/oauth/token"),
            OAuth2Provider::GitHub => Some("https://github.com/login/oauth/access_token"),
            OAuth2Provider::Custom => None,
        }
    }

    pub fn userinfo_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://www.googleapis.com/oauth2/v3/userinfo"),
            OAuth2Provider::Naver => Some("https://openapi.naver.com/v1/nid/me"),
            OAuth2Provider::Kakao => Some("https://kapi.kakao.com/v2/user/me"),
            OAuth2Provider::GitHub => Some("https://api.github.com/user"),
            OAuth2Provider::Custom => None,
        }
    }

    pub fn default_scopes(&self) -> Vec<&'static str> {
        match self {
            OAuth2Provider::Google => vec!["openid", "profile", "email"],
            OAuth2Provider::Naver => vec!["name", "email"],
            OAuth2Provider::Kakao => vec!["profile_nickname", "account_email"],
            OAuth2Provider::GitHub => vec!["read:user", "user:email"],
            OAuth2Provider::Custom => vec![],
        }
    }

    /// Attribute holding the provider's user id. Naver nests it under `response`.
    pub fn user_name_attribute(&self) -> &'static str {
        match self {
            OAuth2Provider::Google => "sub",
            OAuth2Provider::Naver => "response",
            OAuth2Provider::Kakao | OAuth2Provider::GitHub | OAuth2Provider::Custom => "id",
        }
    }

    /// Naver and Kakao expect the client credentials in the token request body.
    pub fn client_authentication_method(&self) -> ClientAuthenticationMethod {
        match self {
            OAuth2Provider::Naver | OAuth2Provider::Kakao => ClientAuthenticationMethod::ClientSecretPost,
            _ => ClientAuthenticationMethod::ClientSecretBasic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthenticationMethod {
    ClientSecretBasic,
    ClientSecretPost,
}

// =============================================================================
// Client Registration
// =============================================================================

/// One configured OAuth2 client.
///
/// `redirect_uri` may use the `{baseUrl}` and `{registrationId}` placeholders;
/// the default is `{baseUrl}/login/oauth2/code/{registrationId}`.
///
/// # Example
/// ```
/// use parking_security_core::http::security::oauth2::{ClientRegistration, OAuth2Provider};
///
/// let naver = ClientRegistration::with_provider(OAuth2Provider::Naver, "client-id", "client-secret");
/// assert_eq!(naver.registration_id(), "naver");
/// assert_eq!(
///     naver.resolve_redirect_uri("http://localhost:8080"),
///     "http://localhost:8080/login/oauth2/code/naver"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    registration_id: String,
    client_name: String,
    provider: OAuth2Provider,
    client_id: String,
    client_secret: String,
    client_authentication_method: ClientAuthenticationMethod,
    redirect_uri: String,
    authorization_uri: Option<String>,
    token_uri: Option<String>,
    user_info_uri: Option<String>,
    user_name_attribute: String,
    scopes: Vec<String>,
    use_pkce: bool,
}

impl ClientRegistration {
    pub fn with_provider(
        provider: OAuth2Provider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            registration_id: provider.registration_id().to_string(),
            client_name: provider.client_name().to_string(),
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client_authentication_method: provider.client_authentication_method(),
            redirect_uri: "{baseUrl}/login/oauth2/code/{registrationId}".to_string(),
            authorization_uri: provider.auth_url().map(String::from),
            token_uri: provider.token_url().map(String::from),
            user_info_uri: provider.userinfo_url().map(String::from),
            user_name_attribute: provider.user_name_attribute().to_string(),
            scopes: provider.default_scopes().into_iter().map(String::from).collect(),
            use_pkce: false,
        }
    }

    pub fn with_registration_id(mut self, id: impl Into<String>) -> Self {
        self.registration_id = id.into();
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn client_authentication_method(mut self, method: ClientAuthenticationMethod) -> Self {
        self.client_authentication_method = method;
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn authorization_uri(mut self, uri: impl Into<String>) -> Self {
        self.authorization_uri = Some(uri.into());
        self
    }

    pub fn token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = Some(uri.into());
        self
    }

    pub fn user_info_uri(mut self, uri: impl Into<String>) -> Self {
        self.user_info_uri = Some(uri.into());
        self
    }

    pub fn user_name_attribute(mut self, attr: impl Into<String>) -> Self {
        self.user_name_attribute = attr.into();
        self
    }

    pub fn scopes<S: Into<String>>(mut self, scopes: Vec<S>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn use_pkce(mut self, use_pkce: bool) -> Self {
        self.use_pkce = use_pkce;
        self
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn get_client_name(&self) -> &str {
        &self.client_name
    }

    pub fn provider(&self) -> OAuth2Provider {
        self.provider
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn get_scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn get_user_name_attribute(&self) -> &str {
        &self.user_name_attribute
    }

    pub fn resolve_redirect_uri(&self, base_url: &str) -> String {
        self.redirect_uri
            .replace("{baseUrl}", base_url.trim_end_matches('/'))
            .replace("{registrationId}", &self.registration_id)
    }
}

// =============================================================================
// OAuth2 Client
// =============================================================================

/// A registration bound to an `oauth2` client.
#[derive(Clone)]
pub struct OAuth2Client {
    registration: ClientRegistration,
    client: BasicClient,
    http: reqwest::Client,
}

/// Everything needed to redirect to the provider and later verify the callback.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: AuthorizationState,
}

/// Authorization state kept in the session between redirect and callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    pub registration_id: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce_verifier: Option<String>,
}

impl OAuth2Client {
    pub fn new(registration: ClientRegistration, base_url: &str) -> Result<Self, OAuth2Error> {
        let auth_url = registration
            .authorization_uri
            .as_ref()
            .ok_or_else(|| OAuth2Error::Configuration("Missing authorization URI".to_string()))?;
        let token_url = registration
            .token_uri
            .as_ref()
            .ok_or_else(|| OAuth2Error::Configuration("Missing token URI".to_string()))?;
        if registration.user_info_uri.is_none() {
            return Err(OAuth2Error::Configuration("Missing userinfo URI".to_string()));
        }

        let client = BasicClient::new(
            ClientId::new(registration.client_id.clone()),
            Some(ClientSecret::new(registration.client_secret.clone())),
            AuthUrl::new(auth_url.clone()).map_err(|e| OAuth2Error::Configuration(e.to_string()))?,
            Some(TokenUrl::new(token_url.clone()).map_err(|e| OAuth2Error::Configuration(e.to_string()))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(registration.resolve_redirect_uri(base_url))
                .map_err(|e| OAuth2Error::Configuration(e.to_string()))?,
        );

        let client = match registration.client_authentication_method {
            ClientAuthenticationMethod::ClientSecretPost => client.set_auth_type(AuthType::RequestBody),
            ClientAuthenticationMethod::ClientSecretBasic => client.set_auth_type(AuthType::BasicAuth),
        };

        Ok(Self {
            registration,
            client,
            http: reqwest::Client::new(),
        })
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    /// Builds the provider URL with a fresh state (and PKCE challenge when enabled).
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.registration.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let pkce_verifier = if self.registration.use_pkce {
            let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
            request = request.set_pkce_challenge(challenge);
            Some(verifier.secret().clone())
        } else {
            None
        };

        let (url, state) = request.url();
        AuthorizationRequest {
            url,
            state: AuthorizationState {
                registration_id: self.registration.registration_id.clone(),
                state: state.secret().clone(),
                pkce_verifier,
            },
        }
    }

    /// Exchanges the authorization code for an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<String>,
    ) -> Result<String, OAuth2Error> {
        let mut request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let token = request
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuth2Error::TokenExchange(e.to_string()))?;
        Ok(token.access_token().secret().clone())
    }

    /// Queries the userinfo endpoint.
    pub async fn fetch_user_attributes(&self, access_token: &str) -> Result<OAuth2Attributes, OAuth2Error> {
        let userinfo_url = self
            .registration
            .user_info_uri
            .as_ref()
            .ok_or_else(|| OAuth2Error::UserInfo("Missing userinfo URI".to_string()))?;

        let response = self
            .http
            .get(userinfo_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .header("User-Agent", "honors-parking")
            .send()
            .await
            .map_err(|e| OAuth2Error::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuth2Error::UserInfo(format!("HTTP {}", response.status())));
        }

        response
            .json::<OAuth2Attributes>()
            .await
            .map_err(|e| OAuth2Error::UserInfo(e.to_string()))
    }
}

/// Registered clients keyed by registration id.
///
/// # Spring Equivalent
/// `InMemoryClientRegistrationRepository`
#[derive(Clone, Default)]
pub struct ClientRegistrationRepository {
    clients: BTreeMap<String, OAuth2Client>,
}

impl ClientRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: OAuth2Client) -> Self {
        self.clients
            .insert(client.registration().registration_id().to_string(), client);
        self
    }

    pub fn find_by_registration_id(&self, registration_id: &str) -> Option<&OAuth2Client> {
        self.clients.get(registration_id)
    }

    /// Registrations in id order.
    pub fn registrations(&self) -> impl Iterator<Item = &ClientRegistration> {
        self.clients.values().map(OAuth2Client::registration)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// =============================================================================
// User Service
// =============================================================================

/// Input of [`OAuth2UserService::load_user`].
///
/// The userinfo endpoint has already been queried; `attributes` is its JSON body.
#[derive(Debug, Clone)]
pub struct OAuth2UserRequest {
    pub registration_id: String,
    pub provider: OAuth2Provider,
    pub user_name_attribute: String,
    pub access_token: String,
    pub attributes: OAuth2Attributes,
}

impl OAuth2UserRequest {
    /// The provider's user id.
    ///
    /// Strings and numbers are used as is; an object (Naver's `response`)
    /// contributes its `id` member.
    pub fn user_name(&self) -> Option<String> {
        fn scalar(value: &Value) -> Option<String> {
            match value {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        }

        match self.attributes.get(&self.user_name_attribute)? {
            Value::Object(nested) => nested.get("id").and_then(scalar),
            value => scalar(value),
        }
    }
}

/// Maps provider attributes to an application user.
///
/// # Spring Equivalent
/// `OAuth2UserService<OAuth2UserRequest, OAuth2User>`
#[async_trait]
pub trait OAuth2UserService: Send + Sync {
    async fn load_user(&self, request: OAuth2UserRequest) -> Result<User, OAuth2Error>;
}

/// Uses the user-name attribute as username and grants role `USER`.
///
/// # Spring Equivalent
/// `DefaultOAuth2UserService`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOAuth2UserService;

#[async_trait]
impl OAuth2UserService for DefaultOAuth2UserService {
    async fn load_user(&self, request: OAuth2UserRequest) -> Result<User, OAuth2Error> {
        let name = request.user_name().ok_or_else(|| {
            OAuth2Error::UserInfo(format!(
                "Missing attribute '{}' in userinfo response",
                request.user_name_attribute
            ))
        })?;
        Ok(User::without_password(&name).roles(&["USER".to_string()]))
    }
}

// =============================================================================
// Login Configuration & Handler
// =============================================================================

/// # Spring Security Equivalent
/// `OAuth2LoginConfigurer`
#[derive(Clone)]
pub struct OAuth2LoginConfig {
    login_page: String,
    default_success_url: String,
    always_use_default_success_url: bool,
    failure_url: Option<String>,
    authorization_base_uri: String,
    redirection_base_uri: String,
    clients: ClientRegistrationRepository,
    user_service: Arc<dyn OAuth2UserService>,
}

impl Default for OAuth2LoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuth2LoginConfig {
    pub fn new() -> Self {
        Self {
            login_page: "/login".to_string(),
            default_success_url: "/".to_string(),
            always_use_default_success_url: false,
            failure_url: None,
            authorization_base_uri: "/oauth2/authorization".to_string(),
            redirection_base_uri: "/login/oauth2/code".to_string(),
            clients: ClientRegistrationRepository::new(),
            user_service: Arc::new(DefaultOAuth2UserService),
        }
    }

    /// # Spring Equivalent
    /// `oauth2Login().loginPage("/login")`
    pub fn login_page(mut self, url: &str) -> Self {
        self.login_page = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `oauth2Login().defaultSuccessUrl("/api/v1/my", true)`
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

    /// # Spring Equivalent
    /// `oauth2Login().authorizationEndpoint().baseUri(..)`
    pub fn authorization_base_uri(mut self, uri: &str) -> Self {
        self.authorization_base_uri = uri.trim_end_matches('/').to_string();
        self
    }

    /// # Spring Equivalent
    /// `oauth2Login().redirectionEndpoint().baseUri(..)`
    pub fn redirection_base_uri(mut self, uri: &str) -> Self {
        self.redirection_base_uri = uri.trim_end_matches('/').to_string();
        self
    }

    pub fn client_registration_repository(mut self, clients: ClientRegistrationRepository) -> Self {
        self.clients = clients;
        self
    }

    /// # Spring Equivalent
    /// `oauth2Login().userInfoEndpoint().userService(customOAuth2UserService)`
    pub fn user_service<U: OAuth2UserService + 'static>(mut self, service: U) -> Self {
        self.user_service = Arc::new(service);
        self
    }

    pub fn get_login_page(&self) -> &str {
        &self.login_page
    }

    pub fn get_failure_url(&self) -> String {
        self.failure_url
            .clone()
            .unwrap_or_else(|| format!("{}?error", self.login_page))
    }

    pub fn get_authorization_base_uri(&self) -> &str {
        &self.authorization_base_uri
    }

    pub fn get_redirection_base_uri(&self) -> &str {
        &self.redirection_base_uri
    }

    pub fn clients(&self) -> &ClientRegistrationRepository {
        &self.clients
    }
}

/// Query parameters of the provider callback.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizationResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Drives both OAuth2 login endpoints.
#[derive(Clone)]
pub struct OAuth2LoginHandler {
    config: Arc<OAuth2LoginConfig>,
    session_config: SessionConfig,
    authorization_matcher: AntMatcher,
    redirection_matcher: AntMatcher,
    state_key: String,
}

impl OAuth2LoginHandler {
    pub fn new(config: OAuth2LoginConfig, session_config: SessionConfig) -> Self {
        let authorization_matcher =
            AntMatcher::new(&format!("{}/{{registrationId}}", config.authorization_base_uri));
        let redirection_matcher =
            AntMatcher::new(&format!("{}/{{registrationId}}", config.redirection_base_uri));
        Self {
            config: Arc::new(config),
            session_config,
            authorization_matcher,
            redirection_matcher,
            state_key: "OAUTH2_AUTHORIZATION_REQUEST".to_string(),
        }
    }

    pub fn config(&self) -> &OAuth2LoginConfig {
        &self.config
    }

    /// Registration id of an authorization request path.
    pub fn match_authorization_request(&self, path: &str) -> Option<String> {
        self.authorization_matcher
            .extract_variables(path)
            .and_then(|mut vars| vars.remove("registrationId"))
    }

    /// Registration id of a provider callback path.
    pub fn match_callback_request(&self, path: &str) -> Option<String> {
        self.redirection_matcher
            .extract_variables(path)
            .and_then(|mut vars| vars.remove("registrationId"))
    }

    /// Stores fresh state in the session and redirects to the provider.
    pub fn authorize(&self, session: &Session, registration_id: &str) -> HttpResponse {
        let result = self
            .config
            .clients
            .find_by_registration_id(registration_id)
            .ok_or_else(|| OAuth2Error::UnknownRegistration(registration_id.to_string()))
            .and_then(|client| {
                let request = client.authorization_url();
                session
                    .insert(&self.state_key, &request.state)
                    .map_err(|e| OAuth2Error::Session(e.to_string()))?;
                Ok(request.url)
            });

        match result {
            Ok(url) => redirect(url.to_string()),
            Err(e) => self.failure(e),
        }
    }

    /// Completes the login for a provider callback.
    pub async fn callback(
        &self,
        session: &Session,
        registration_id: &str,
        response: AuthorizationResponse,
    ) -> HttpResponse {
        match self.authenticate(session, registration_id, response).await {
            Ok(user) => {
                if let Err(e) = SessionAuthenticator::login(session, &user, &self.session_config) {
                    return self.failure(OAuth2Error::Session(e.to_string()));
                }
                log::info!(
                    "User '{}' logged in with OAuth2 provider '{}'",
                    user.get_username(),
                    registration_id
                );
                redirect(SessionAuthenticator::success_redirect_url(
                    session,
                    &self.session_config,
                    &self.config.default_success_url,
                    self.config.always_use_default_success_url,
                ))
            }
            Err(e) => self.failure(e),
        }
    }

    async fn authenticate(
        &self,
        session: &Session,
        registration_id: &str,
        response: AuthorizationResponse,
    ) -> Result<User, OAuth2Error> {
        let saved = session
            .remove_as::<AuthorizationState>(&self.state_key)
            .and_then(Result::ok)
            .ok_or(OAuth2Error::InvalidState)?;

        if let Some(error) = response.error {
            let description = response.error_description.unwrap_or_default();
            return Err(OAuth2Error::AuthorizationDenied(format!("{} {}", error, description)));
        }

        let state_matches = response.state.as_deref() == Some(saved.state.as_str());
        if !state_matches || saved.registration_id != registration_id {
            return Err(OAuth2Error::InvalidState);
        }

        let code = response
            .code
            .ok_or_else(|| OAuth2Error::TokenExchange("Missing authorization code".to_string()))?;
        let client = self
            .config
            .clients
            .find_by_registration_id(registration_id)
            .ok_or_else(|| OAuth2Error::UnknownRegistration(registration_id.to_string()))?;

        let access_token = client.exchange_code(&code, saved.pkce_verifier).await?;
        let attributes = client.fetch_user_attributes(&access_token).await?;

        let registration = client.registration();
        self.config
            .user_service
            .load_user(OAuth2UserRequest {
                registration_id: registration.registration_id().to_string(),
                provider: registration.provider(),
                user_name_attribute: registration.get_user_name_attribute().to_string(),
                access_token,
                attributes,
            })
            .await
    }

    fn failure(&self, error: OAuth2Error) -> HttpResponse {
        log::warn!("OAuth2 login failed: {}", error);
        redirect(self.config.get_failure_url())
    }
}
