//! URL rule based authorization.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.web.access.intercept.RequestMatcherDelegatingAuthorizationManager`
//! as configured through `authorizeHttpRequests(..)`.
//!
//! Rules are evaluated in declaration order and the first matching rule decides.
//!
//! # Example
//! ```
//! use parking_security_core::http::security::authorizer::{AuthorizeHttpRequests, AuthorizationDecision};
//! use parking_security_core::http::security::User;
//!
//! let rules = AuthorizeHttpRequests::new()
//!     .request_matchers(&["/login/**", "/api/v1/join"]).permit_all()
//!     .request_matchers(&["/api/v1/admin"]).has_role("ADMIN")
//!     .any_request().authenticated();
//!
//! let member = User::without_password("member").roles(&["USER".into()]);
//!
//! assert_eq!(rules.decide("/api/v1/join", None), AuthorizationDecision::Granted);
//! assert_eq!(rules.decide("/api/v1/admin", None), AuthorizationDecision::Unauthenticated);
//! assert_eq!(rules.decide("/api/v1/admin", Some(&member)), AuthorizationDecision::Denied);
//! ```

use std::fmt;

use actix_web::dev::ServiceRequest;

use crate::http::security::ant_matcher::AntMatchers;
use crate::http::security::config::Authorizer;
use crate::http::security::user::User;

/// Outcome of evaluating the rules for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// The request proceeds to the handler.
    Granted,
    /// The request needs an authenticated user; the entry point answers.
    Unauthenticated,
    /// The user is known but lacks the required role or authority.
    Denied,
}

impl AuthorizationDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthorizationDecision::Granted)
    }
}

// =============================================================================
// Access Requirement
// =============================================================================

/// Access requirement attached to a rule.
///
/// Roles are compared without the `ROLE_` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// `permitAll()`
    PermitAll,
    /// `authenticated()`
    Authenticated,
    /// `hasRole("ADMIN")`
    HasRole(String),
    /// `hasAnyRole("ADMIN", "USER")`
    HasAnyRole(Vec<String>),
    /// `hasAuthority("parking:write")`
    HasAuthority(String),
    /// `denyAll()`
    DenyAll,
}

impl Access {
    /// Evaluates the requirement against an optional user.
    ///
    /// Anonymous requests on anything but `PermitAll` are `Unauthenticated`,
    /// so they reach the entry point rather than a bare `403`.
    pub fn evaluate(&self, user: Option<&User>) -> AuthorizationDecision {
        let user = match (self, user) {
            (Access::PermitAll, _) => return AuthorizationDecision::Granted,
            (_, None) => return AuthorizationDecision::Unauthenticated,
            (_, Some(user)) => user,
        };

        let granted = match self {
            Access::PermitAll | Access::Authenticated => true,
            Access::HasRole(role) => user.has_role(role),
            Access::HasAnyRole(roles) => user.has_any_role(roles.as_slice()),
            Access::HasAuthority(authority) => user.has_authority(authority),
            Access::DenyAll => false,
        };

        if granted {
            AuthorizationDecision::Granted
        } else {
            AuthorizationDecision::Denied
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::PermitAll => write!(f, "permitAll"),
            Access::Authenticated => write!(f, "authenticated"),
            Access::HasRole(role) => write!(f, "hasRole('{}')", role),
            Access::HasAnyRole(roles) => write!(f, "hasAnyRole({})", roles.join(", ")),
            Access::HasAuthority(authority) => write!(f, "hasAuthority('{}')", authority),
            Access::DenyAll => write!(f, "denyAll"),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

#[derive(Debug, Clone)]
enum RequestMatcher {
    Patterns(AntMatchers),
    AnyRequest,
}

impl RequestMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            RequestMatcher::Patterns(patterns) => patterns.matches(path),
            RequestMatcher::AnyRequest => true,
        }
    }
}

#[derive(Debug, Clone)]
struct RequestRule {
    matcher: RequestMatcher,
    access: Access,
}

/// Ordered URL rules.
///
/// # Spring Security Equivalent
/// `AuthorizeHttpRequestsConfigurer.AuthorizationManagerRequestMatcherRegistry`
#[derive(Debug, Clone, Default)]
pub struct AuthorizeHttpRequests {
    rules: Vec<RequestRule>,
    any_request_declared: bool,
}

impl AuthorizeHttpRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a rule for the given Ant patterns.
    pub fn request_matchers<S: AsRef<str>>(self, patterns: &[S]) -> RuleBuilder {
        RuleBuilder {
            registry: self,
            matcher: RequestMatcher::Patterns(AntMatchers::from_patterns(patterns)),
        }
    }

    /// Starts the catch-all rule.
    pub fn any_request(self) -> RuleBuilder {
        RuleBuilder {
            registry: self,
            matcher: RequestMatcher::AnyRequest,
        }
    }

    /// Inserts permit-all rules ahead of every declared rule.
    ///
    /// Used by login configurers so their own pages stay reachable.
    pub(crate) fn permit_first<S: AsRef<str>>(&mut self, patterns: &[S]) {
        self.rules.insert(
            0,
            RequestRule {
                matcher: RequestMatcher::Patterns(AntMatchers::from_patterns(patterns)),
                access: Access::PermitAll,
            },
        );
    }

    /// True when a rule was declared after `any_request()`; such rules can never match.
    pub fn has_unreachable_rules(&self) -> bool {
        let catch_all = self
            .rules
            .iter()
            .position(|r| matches!(r.matcher, RequestMatcher::AnyRequest));
        matches!(catch_all, Some(idx) if idx + 1 < self.rules.len())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The access requirement of the first rule matching `path`.
    pub fn find_access(&self, path: &str) -> Option<&Access> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| &rule.access)
    }

    /// Evaluates the first matching rule. Unmatched paths are granted.
    pub fn decide(&self, path: &str, user: Option<&User>) -> AuthorizationDecision {
        match self.find_access(path) {
            Some(access) => {
                let decision = access.evaluate(user);
                log::debug!("{} -> {} = {:?}", path, access, decision);
                decision
            }
            None => AuthorizationDecision::Granted,
        }
    }

    fn push(mut self, matcher: RequestMatcher, access: Access) -> Self {
        if self.any_request_declared {
            log::warn!("rule {} declared after anyRequest() will never match", access);
        }
        if matches!(matcher, RequestMatcher::AnyRequest) {
            self.any_request_declared = true;
        }
        self.rules.push(RequestRule { matcher, access });
        self
    }
}

impl Authorizer for AuthorizeHttpRequests {
    fn decide(&self, req: &ServiceRequest, user: Option<&User>) -> AuthorizationDecision {
        AuthorizeHttpRequests::decide(self, req.path(), user)
    }
}

/// Pending rule: a matcher waiting for its access requirement.
#[must_use = "a rule is only registered once an access requirement is chosen"]
pub struct RuleBuilder {
    registry: AuthorizeHttpRequests,
    matcher: RequestMatcher,
}

impl RuleBuilder {
    pub fn permit_all(self) -> AuthorizeHttpRequests {
        self.access(Access::PermitAll)
    }

    pub fn authenticated(self) -> AuthorizeHttpRequests {
        self.access(Access::Authenticated)
    }

    pub fn has_role(self, role: &str) -> AuthorizeHttpRequests {
        self.access(Access::HasRole(role.to_string()))
    }

    pub fn has_any_role<S: AsRef<str>>(self, roles: &[S]) -> AuthorizeHttpRequests {
        self.access(Access::HasAnyRole(
            roles.iter().map(|r| r.as_ref().to_string()).collect(),
        ))
    }

    pub fn has_authority(self, authority: &str) -> AuthorizeHttpRequests {
        self.access(Access::HasAuthority(authority.to_string()))
    }

    pub fn deny_all(self) -> AuthorizeHttpRequests {
        self.access(Access::DenyAll)
    }

    pub fn access(self, access: Access) -> AuthorizeHttpRequests {
        self.registry.push(self.matcher, access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parking_rules() -> AuthorizeHttpRequests {
        AuthorizeHttpRequests::new()
            .request_matchers(&["/login/**", "/oauth2/**", "/api/v1/join", "/confirm"])
            .permit_all()
            .request_matchers(&["/api/v1/admin"])
            .has_role("ADMIN")
            .request_matchers(&["/api/v1/my/**"])
            .has_any_role(&["ADMIN", "USER"])
            .any_request()
            .authenticated()
    }

    fn user(roles: &[&str]) -> User {
        User::without_password("someone")
            .roles(&roles.iter().map(|r| r.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_public_paths_granted_to_anonymous() {
        let rules = parking_rules();
        for path in ["/login", "/login/oauth2/code/naver", "/oauth2/authorization/kakao", "/api/v1/join", "/confirm"] {
            assert_eq!(rules.decide(path, None), AuthorizationDecision::Granted, "{}", path);
        }
    }

    #[test]
    fn test_admin_path() {
        let rules = parking_rules();
        assert_eq!(rules.decide("/api/v1/admin", None), AuthorizationDecision::Unauthenticated);
        assert_eq!(rules.decide("/api/v1/admin", Some(&user(&["USER"]))), AuthorizationDecision::Denied);
        assert_eq!(rules.decide("/api/v1/admin", Some(&user(&["ADMIN"]))), AuthorizationDecision::Granted);
        assert_eq!(rules.decide("/api/v1/admin/", Some(&user(&["USER"]))), AuthorizationDecision::Denied);
    }

    #[test]
    fn test_my_path_any_role() {
        let rules = parking_rules();
        assert!(rules.decide("/api/v1/my/profile", Some(&user(&["USER"]))).is_granted());
        assert!(rules.decide("/api/v1/my", Some(&user(&["ADMIN"]))).is_granted());
        assert_eq!(rules.decide("/api/v1/my/profile", Some(&user(&[]))), AuthorizationDecision::Denied);
        assert_eq!(rules.decide("/api/v1/my", None), AuthorizationDecision::Unauthenticated);
    }

    #[test]
    fn test_any_request_requires_authentication() {
        let rules = parking_rules();
        assert_eq!(rules.decide("/api/v1/lots", None), AuthorizationDecision::Unauthenticated);
        assert!(rules.decide("/api/v1/lots", Some(&user(&[]))).is_granted());
    }

    #[test]
    fn test_first_match_wins() {
        let rules = AuthorizeHttpRequests::new()
            .request_matchers(&["/api/**"])
            .permit_all()
            .request_matchers(&["/api/v1/admin"])
            .deny_all();
        assert!(rules.decide("/api/v1/admin", None).is_granted());
    }

    #[test]
    fn test_unmatched_without_catch_all_is_granted() {
        let rules = AuthorizeHttpRequests::new().request_matchers(&["/admin"]).deny_all();
        assert!(rules.decide("/public", None).is_granted());
    }

    #[test]
    fn test_deny_all_and_authority() {
        let rules = AuthorizeHttpRequests::new()
            .request_matchers(&["/closed"])
            .deny_all()
            .request_matchers(&["/lots/**"])
            .has_authority("parking:write");
        let writer = user(&[]).authorities(&["parking:write".into()]);

        assert_eq!(rules.decide("/closed", None), AuthorizationDecision::Unauthenticated);
        assert_eq!(rules.decide("/closed", Some(&writer)), AuthorizationDecision::Denied);
        assert!(rules.decide("/lots/3", Some(&writer)).is_granted());
        assert_eq!(rules.decide("/lots/3", Some(&user(&["ADMIN"]))), AuthorizationDecision::Denied);
    }

    #[test]
    fn test_permit_first_and_unreachable_rules() {
        let mut rules = AuthorizeHttpRequests::new().any_request().authenticated();
        rules.permit_first(&["/login"]);
        assert!(rules.decide("/login", None).is_granted());
        assert!(!rules.has_unreachable_rules());

        let rules = rules.request_matchers(&["/late"]).permit_all();
        assert!(rules.has_unreachable_rules());
        assert_eq!(rules.decide("/late", None), AuthorizationDecision::Unauthenticated);
    }

    #[test]
    fn test_access_display() {
        assert_eq!(Access::HasRole("ADMIN".into()).to_string(), "hasRole('ADMIN')");
        assert_eq!(
            Access::HasAnyRole(vec!["ADMIN".into(), "USER".into()]).to_string(),
            "hasAnyRole(ADMIN, USER)"
        );
    }
}
