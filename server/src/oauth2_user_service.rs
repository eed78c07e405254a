//! Maps social login profiles to parking users.
//!
//! # Spring Equivalent
//! The application's `DefaultOAuth2UserService` subclass plugged in with
//! `oauth2Login().userInfoEndpoint().userService(..)`

use async_trait::async_trait;
use serde_json::Value;

use parking_security_core::http::security::{
    InMemoryUserDetailsManager, OAuth2Error, OAuth2Provider, OAuth2UserRequest, OAuth2UserService,
    User,
};

pub const DEFAULT_ROLE: &str = "USER";

/// Profile fields common to every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Profile {
    pub provider_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl OAuth2Profile {
    /// Reads the provider specific userinfo layout.
    pub fn from_request(request: &OAuth2UserRequest) -> Option<Self> {
        let attributes = &request.attributes;
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_string);

        let (name, email) = match request.provider {
            // {"resultcode":"00","response":{"id":..,"name":..,"email":..}}
            OAuth2Provider::Naver => {
                let response = attributes.get("response");
                (
                    text(response.and_then(|r| r.get("name"))),
                    text(response.and_then(|r| r.get("email"))),
                )
            }
            // {"id":123,"kakao_account":{"email":..,"profile":{"nickname":..}},"properties":{"nickname":..}}
            OAuth2Provider::Kakao => {
                let account = attributes.get("kakao_account");
                let nickname = text(account.and_then(|a| a.pointer("/profile/nickname")))
                    .or_else(|| text(attributes.get("properties").and_then(|p| p.get("nickname"))));
                (nickname, text(account.and_then(|a| a.get("email"))))
            }
            OAuth2Provider::GitHub => (
                text(attributes.get("name")).or_else(|| text(attributes.get("login"))),
                text(attributes.get("email")),
            ),
            OAuth2Provider::Google | OAuth2Provider::Custom => {
                (text(attributes.get("name")), text(attributes.get("email")))
            }
        };

        Some(OAuth2Profile {
            provider_id: request.user_name()?,
            name,
            email,
        })
    }
}

/// Resolves the provider profile to a local account, creating it on first login.
///
/// Social accounts are stored as `<registrationId>_<providerId>` without a
/// local password, so they can only log in through their provider.
#[derive(Clone)]
pub struct CustomOAuth2UserService {
    users: InMemoryUserDetailsManager,
}

impl CustomOAuth2UserService {
    pub fn new(users: InMemoryUserDetailsManager) -> Self {
        Self { users }
    }

    pub fn username(registration_id: &str, provider_id: &str) -> String {
        format!("{}_{}", registration_id, provider_id)
    }

    /// True for names in the `<registrationId>_` space of a known provider.
    ///
    /// Local sign-up must stay out of it, otherwise a password account could
    /// be claimed before the provider's user logs in for the first time.
    pub fn is_social_username(username: &str) -> bool {
        let username = username.to_ascii_lowercase();
        OAuth2Provider::ALL
            .iter()
            .any(|provider| username.starts_with(&format!("{}_", provider.registration_id())))
    }
}

#[async_trait]
impl OAuth2UserService for CustomOAuth2UserService {
    async fn load_user(&self, request: OAuth2UserRequest) -> Result<User, OAuth2Error> {
        let profile = OAuth2Profile::from_request(&request).ok_or_else(|| {
            OAuth2Error::UserInfo(format!(
                "{} profile has no '{}' attribute",
                request.registration_id, request.user_name_attribute
            ))
        })?;
        let username = Self::username(&request.registration_id, &profile.provider_id);

        if let Some(existing) = self.users.load_user_by_username(&username) {
            if existing.has_password() {
                return Err(OAuth2Error::AccountConflict(format!(
                    "'{}' is a local account",
                    username
                )));
            }
            log::debug!("Returning social user '{}'", username);
            return Ok(existing);
        }

        let mut user = User::without_password(&username).roles(&[DEFAULT_ROLE.to_string()]);
        if let Some(name) = profile.name {
            user = user.display_name(name);
        }
        if self.users.create_user(user.clone()).is_ok() {
            log::info!("Registered social user '{}' from {}", username, request.registration_id);
        }
        Ok(user)
    }
}
