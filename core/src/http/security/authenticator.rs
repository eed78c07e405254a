//! In-Memory User Details Manager.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.provisioning.InMemoryUserDetailsManager`

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use derive_more::{Display, Error};

use crate::http::security::crypto::{NoOpPasswordEncoder, PasswordEncoder};
use crate::http::security::session::CredentialAuthenticator;
use crate::http::security::user::User;

/// Errors raised when provisioning users.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum UserStoreError {
    #[display("user '{_0}' already exists")]
    AlreadyExists(#[error(not(source))] String),
    #[display("user '{_0}' not found")]
    NotFound(#[error(not(source))] String),
}

/// Thread-safe in-memory user store that can also verify credentials.
///
/// Cloning shares the underlying map, so a clone handed to the security
/// middleware sees users registered later through another clone.
///
/// # Example
/// ```
/// use parking_security_core::http::security::authenticator::InMemoryUserDetailsManager;
/// use parking_security_core::http::security::crypto::{BCryptPasswordEncoder, PasswordEncoder};
/// use parking_security_core::http::security::session::CredentialAuthenticator;
/// use parking_security_core::http::security::User;
///
/// let encoder = BCryptPasswordEncoder::with_cost(4);
/// let store = InMemoryUserDetailsManager::new(encoder.clone());
/// store
///     .create_user(User::with_encoded_password("admin", encoder.encode("admin").unwrap())
///         .roles(&["ADMIN".into()]))
///     .unwrap();
///
/// assert!(store.authenticate("admin", "admin").is_some());
/// assert!(store.authenticate("admin", "wrong").is_none());
/// ```
#[derive(Clone)]
pub struct InMemoryUserDetailsManager {
    users: Arc<RwLock<HashMap<String, User>>>,
    password_encoder: Arc<dyn PasswordEncoder>,
}

impl InMemoryUserDetailsManager {
    /// # Spring Security Equivalent
    /// `AuthenticationManagerBuilder.passwordEncoder(PasswordEncoder)`
    pub fn new<E: PasswordEncoder + 'static>(encoder: E) -> Self {
        InMemoryUserDetailsManager {
            users: Arc::new(RwLock::new(HashMap::new())),
            password_encoder: Arc::new(encoder),
        }
    }

    /// Store whose passwords are compared in plain text. Tests only.
    pub fn plain_text() -> Self {
        Self::new(NoOpPasswordEncoder)
    }

    /// Builder form of [`create_user`](Self::create_user); duplicates are skipped with a warning.
    pub fn with_user(self, user: User) -> Self {
        if let Err(e) = self.create_user(user) {
            log::warn!("{}, skipping", e);
        }
        self
    }

    pub fn password_encoder(&self) -> &dyn PasswordEncoder {
        self.password_encoder.as_ref()
    }

    /// Adds a user whose password is already encoded.
    pub fn create_user(&self, user: User) -> Result<(), UserStoreError> {
        use std::collections::hash_map::Entry;

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.entry(user.get_username().to_string()) {
            Entry::Occupied(e) => Err(UserStoreError::AlreadyExists(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(user);
                Ok(())
            }
        }
    }

    pub fn delete_user(&self, username: &str) -> Result<(), UserStoreError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| UserStoreError::NotFound(username.to_string()))
    }

    pub fn user_exists(&self, username: &str) -> bool {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.contains_key(username)
    }

    /// # Spring Security Equivalent
    /// `UserDetailsService.loadUserByUsername`
    pub fn load_user_by_username(&self, username: &str) -> Option<User> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(username).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialAuthenticator for InMemoryUserDetailsManager {
    fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.load_user_by_username(username)?;
        if self.password_encoder.matches(password, user.get_password()) {
            Some(user.erase_credentials())
        } else {
            log::debug!("Bad credentials for user '{}'", username);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::crypto::BCryptPasswordEncoder;

    fn store() -> InMemoryUserDetailsManager {
        InMemoryUserDetailsManager::plain_text()
            .with_user(User::new("user".into(), "user".into()).roles(&["USER".into()]))
            .with_user(User::new("admin".into(), "admin".into()).roles(&["ADMIN".into()]))
    }

    #[test]
    fn test_authenticate() {
        let store = store();
        let admin = store.authenticate("admin", "admin").unwrap();
        assert!(admin.has_role("ADMIN"));
        assert_eq!(admin.get_password(), "");

        assert!(store.authenticate("admin", "user").is_none());
        assert!(store.authenticate("ghost", "ghost").is_none());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = store();
        let err = store.create_user(User::new("user".into(), "other".into())).unwrap_err();
        assert_eq!(err, UserStoreError::AlreadyExists("user".into()));
        assert_eq!(store.len(), 2);
        assert!(store.authenticate("user", "user").is_some());
    }

    #[test]
    fn test_clones_share_users() {
        let store = store();
        let handle = store.clone();
        handle.create_user(User::new("late".into(), "pw".into())).unwrap();

        assert!(store.user_exists("late"));
        assert!(store.authenticate("late", "pw").is_some());
    }

    #[test]
    fn test_delete_user() {
        let store = store();
        store.delete_user("user").unwrap();
        assert!(!store.user_exists("user"));
        assert_eq!(
            store.delete_user("user"),
            Err(UserStoreError::NotFound("user".into()))
        );
    }

    #[test]
    fn test_bcrypt_backed_store() {
        let encoder = BCryptPasswordEncoder::with_cost(4);
        let hash = encoder.encode("secret").unwrap();
        let store = InMemoryUserDetailsManager::new(encoder)
            .with_user(User::with_encoded_password("driver", hash));

        assert!(store.authenticate("driver", "secret").is_some());
        assert!(store.authenticate("driver", "Secret").is_none());
        assert!(store.password_encoder().encode("x").is_ok());
    }
}
