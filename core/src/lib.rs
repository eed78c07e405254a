//! Security building blocks for the Honors Parking backend.
//!
//! Everything lives under [`http::security`]: the [`HttpSecurity`] policy
//! builder, the security middleware it produces, and the authentication
//! mechanisms it wires (session, form login, OAuth2 login, HTTP Basic).
//!
//! [`HttpSecurity`]: http::security::HttpSecurity

pub mod http;
