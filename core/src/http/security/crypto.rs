//! Password encoding.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.crypto.password.PasswordEncoder`

use derive_more::{Display, Error};

/// Hashing failure reported by a [`PasswordEncoder`].
#[derive(Debug, Display, Error)]
pub enum CryptoError {
    #[display("password hashing failed: {_0}")]
    Hash(#[error(not(source))] String),
}

/// Encodes and verifies passwords.
///
/// # Spring Security Equivalent
/// `PasswordEncoder` interface
pub trait PasswordEncoder: Send + Sync {
    /// Encodes the raw password.
    ///
    /// # Errors
    /// Returns [`CryptoError::Hash`] when the underlying algorithm fails.
    fn encode(&self, raw_password: &str) -> Result<String, CryptoError>;

    /// Verifies a raw password against a stored hash. Malformed hashes never match.
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;

    /// True if the stored hash should be re-encoded with the current settings.
    fn upgrade_encoding(&self, _encoded_password: &str) -> bool {
        false
    }
}

/// BCrypt password encoder.
///
/// # Spring Security Equivalent
/// `BCryptPasswordEncoder`
///
/// The default strength is 10, the same as `new BCryptPasswordEncoder()`,
/// so hashes produced by the previous backend verify unchanged.
///
/// # Example
/// ```
/// use parking_security_core::http::security::crypto::{BCryptPasswordEncoder, PasswordEncoder};
///
/// let encoder = BCryptPasswordEncoder::with_cost(4);
/// let hash = encoder.encode("parking1234").unwrap();
/// assert!(encoder.matches("parking1234", &hash));
/// assert!(!encoder.matches("parking4321", &hash));
/// ```
#[derive(Clone, Debug)]
pub struct BCryptPasswordEncoder {
    cost: u32,
}

impl BCryptPasswordEncoder {
    pub const DEFAULT_COST: u32 = 10;

    pub fn new() -> Self {
        Self {
            cost: Self::DEFAULT_COST,
        }
    }

    /// Custom cost, clamped to the range BCrypt accepts (4..=31).
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BCryptPasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEncoder for BCryptPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, CryptoError> {
        bcrypt::hash(raw_password, self.cost).map_err(|e| CryptoError::Hash(e.to_string()))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        bcrypt::verify(raw_password, encoded_password).unwrap_or(false)
    }

    fn upgrade_encoding(&self, encoded_password: &str) -> bool {
        // $2a$10$... : the cost sits between the second and third '$'
        match encoded_password
            .strip_prefix("$2")
            .and_then(|rest| rest.split('$').nth(1))
            .and_then(|cost| cost.parse::<u32>().ok())
        {
            Some(hash_cost) => hash_cost < self.cost,
            None => true,
        }
    }
}

/// Plain-text encoder. Test fixtures only.
///
/// # Spring Security Equivalent
/// `NoOpPasswordEncoder`
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, CryptoError> {
        Ok(raw_password.to_string())
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        raw_password == encoded_password
    }
}
