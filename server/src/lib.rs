//! Honors Parking backend.
//!
//! [`security_config::SecurityConfig`] holds the access policy; the handlers
//! behind the protected paths live in [`handlers`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod oauth2_user_service;
pub mod security_config;
