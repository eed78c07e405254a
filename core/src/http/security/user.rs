//! Principal model shared by every authentication mechanism.
//!
//! # Spring Equivalent
//! `UserDetails` / `OAuth2User` principal

use std::fmt;

/// An authenticated principal with roles and authorities.
///
/// Roles are stored without the `ROLE_` prefix: a rule declared with
/// `has_role("ADMIN")` is satisfied by a user built with `.roles(&["ADMIN".into()])`.
///
/// # Example
/// ```
/// use parking_security_core::http::security::User;
///
/// let user = User::new("driver01".into(), "{noop}secret".into())
///     .roles(&["USER".into()])
///     .display_name("Kim Driver");
///
/// assert!(user.has_role("USER"));
/// assert!(!user.has_role("ADMIN"));
/// assert_eq!(user.get_display_name(), "Kim Driver");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    username: String,
    password: String,
    display_name: Option<String>,
    roles: Vec<String>,
    authorities: Vec<String>,
}

impl User {
    /// Creates a user with a raw or already encoded password.
    pub fn new(username: String, password: String) -> Self {
        User {
            username,
            password,
            display_name: None,
            roles: Vec::new(),
            authorities: Vec::new(),
        }
    }

    /// Creates a user whose password was produced by a `PasswordEncoder`.
    ///
    /// # Spring Security Equivalent
    /// `User.withUsername(..).password(encoder.encode(..))`
    pub fn with_encoded_password(username: &str, encoded_password: String) -> Self {
        Self::new(username.to_string(), encoded_password)
    }

    /// Creates a principal that has no local password (OAuth2 login, session restore).
    pub fn without_password(username: &str) -> Self {
        Self::new(username.to_string(), String::new())
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_password(&self) -> &str {
        &self.password
    }

    /// False for principals that can only log in through a provider.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Human readable name, falling back to the username.
    pub fn get_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn get_roles(&self) -> &[String] {
        &self.roles
    }

    pub fn get_authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Sets the display name.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Adds roles, skipping ones already present.
    pub fn roles(mut self, roles: &[String]) -> Self {
        for role in roles {
            if !self.roles.contains(role) {
                self.roles.push(role.clone());
            }
        }
        self
    }

    /// Adds authorities, skipping ones already present.
    pub fn authorities(mut self, authorities: &[String]) -> Self {
        for authority in authorities {
            if !self.authorities.contains(authority) {
                self.authorities.push(authority.clone());
            }
        }
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// OR semantics: true when the user holds at least one of `roles`.
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    /// AND semantics: true when the user holds every role in `roles`.
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().all(|role| self.has_role(role.as_ref()))
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn has_any_authority<S: AsRef<str>>(&self, authorities: &[S]) -> bool {
        authorities.iter().any(|a| self.has_authority(a.as_ref()))
    }

    /// Returns a copy with the password cleared, suitable for request extensions.
    pub fn erase_credentials(&self) -> Self {
        User {
            password: String::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {{ username: {}, roles: {:?}, authorities: {:?} }}",
            self.username, self.roles, self.authorities
        )
    }
}
