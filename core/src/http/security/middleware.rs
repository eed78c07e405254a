//! Security middleware for Actix Web.
//!
//! # Spring Equivalent
//! `FilterChainProxy` running the filters of one `SecurityFilterChain`
//!
//! Each request passes through, in order:
//! 1. CSRF validation (`CsrfFilter`)
//! 2. logout (`LogoutFilter`)
//! 3. form login processing (`UsernamePasswordAuthenticationFilter`)
//! 4. OAuth2 authorization and callback endpoints
//!    (`OAuth2AuthorizationRequestRedirectFilter`, `OAuth2LoginAuthenticationFilter`)
//! 5. authentication from the session, then HTTP Basic (`BasicAuthenticationFilter`)
//! 6. URL authorization (`AuthorizationFilter`)
//!
//! Steps 2 to 4 answer the request themselves. The others either let it
//! through or short-circuit with the entry point or `403`.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use actix_service::{Service, Transform};
use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::http::Method;
use actix_web::{web, Error, HttpMessage, HttpResponse, ResponseError};
use futures_util::future::{ok, LocalBoxFuture, Ready};

use crate::http::error::AuthError;
use crate::http::security::authorizer::AuthorizationDecision;
use crate::http::security::config::{Authenticator, Authorizer};
use crate::http::security::csrf::CsrfError;
use crate::http::security::form_login::redirect;
use crate::http::security::http_basic::decode_basic_credentials;
use crate::http::security::http_security::{ChainInner, EntryPoint, SecurityFilterChain};
use crate::http::security::oauth2::AuthorizationResponse;
use crate::http::security::session::SessionAuthenticator;
use crate::http::security::User;

impl<S, B> Transform<S, ServiceRequest> for SecurityFilterChain
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SecurityService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityService {
            chain: Arc::clone(&self.inner),
            service: Rc::new(service),
        })
    }
}

/// Security middleware service.
pub struct SecurityService<S> {
    chain: Arc<ChainInner>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SecurityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let chain = Arc::clone(&self.chain);

        Box::pin(async move {
            let mut req = req;
            let method = req.method().clone();
            let path = req.path().to_string();

            if let Err(e) = chain.csrf.check_request(&mut req).await {
                log::warn!("{} {} rejected: {}", method, path, e);
                return Ok(respond(req, csrf_failure(&e)));
            }

            if let Some(logout) = chain
                .logout
                .as_ref()
                .filter(|l| l.is_logout_request(&method, &path))
            {
                let res = logout.logout(&req.get_session());
                return Ok(respond(req, res));
            }

            if let Some(form) = chain
                .form_login
                .as_ref()
                .filter(|f| f.is_login_request(&method, &path))
            {
                let params = match req.extract::<web::Form<HashMap<String, String>>>().await {
                    Ok(form) => form.into_inner(),
                    Err(e) => {
                        log::debug!("Unreadable login form: {}", e);
                        HashMap::new()
                    }
                };
                let res = form.process(&req.get_session(), &params).await;
                return Ok(respond(req, res));
            }

            if let Some(oauth2) = chain.oauth2_login.as_ref().filter(|_| method == Method::GET) {
                if let Some(registration_id) = oauth2.match_authorization_request(&path) {
                    let res = oauth2.authorize(&req.get_session(), &registration_id);
                    return Ok(respond(req, res));
                }
                if let Some(registration_id) = oauth2.match_callback_request(&path) {
                    let response = web::Query::<AuthorizationResponse>::from_query(req.query_string())
                        .map(web::Query::into_inner)
                        .unwrap_or_default();
                    let res = oauth2
                        .callback(&req.get_session(), &registration_id, response)
                        .await;
                    return Ok(respond(req, res));
                }
            }

            let user = authenticate(&chain, &req).await;
            if let Some(ref u) = user {
                req.extensions_mut().insert(u.clone());
            }

            match Authorizer::decide(&chain.authorizer, &req, user.as_ref()) {
                AuthorizationDecision::Granted => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                AuthorizationDecision::Unauthenticated => {
                    log::debug!("Anonymous request to {} {} needs authentication", method, path);
                    let res = commence(&chain, &req);
                    Ok(respond(req, res))
                }
                AuthorizationDecision::Denied => {
                    log::warn!(
                        "Access denied to {} {} for '{}'",
                        method,
                        path,
                        user.as_ref().map(User::get_username).unwrap_or("anonymous")
                    );
                    Ok(respond(req, AuthError::Forbidden.error_response()))
                }
            }
        })
    }
}

/// The session principal, or else verified Basic credentials.
async fn authenticate(chain: &ChainInner, req: &ServiceRequest) -> Option<User> {
    if let Some(user) = chain.session_authenticator.get_user(req) {
        return Some(user);
    }

    let (_, users) = chain.basic.as_ref()?;
    let (username, password) = decode_basic_credentials(req)?;
    let users = Arc::clone(users);
    let user = match web::block(move || users.authenticate(&username, &password)).await {
        Ok(user) => user,
        Err(e) => {
            log::error!("Basic credential check did not complete: {}", e);
            None
        }
    };
    if let Some(ref u) = user {
        log::debug!("User '{}' authenticated with HTTP Basic", u.get_username());
    }
    user
}

/// # Spring Equivalent
/// `AuthenticationEntryPoint.commence`
fn commence(chain: &ChainInner, req: &ServiceRequest) -> HttpResponse {
    match &chain.entry_point {
        EntryPoint::Basic(challenge) => {
            let mut res = AuthError::Unauthorized.error_response();
            if let Ok(value) = challenge.parse() {
                res.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
            res
        }
        EntryPoint::LoginRedirect(login_page) => {
            if req.method() == Method::GET {
                let target = match req.query_string() {
                    "" => req.path().to_string(),
                    query => format!("{}?{}", req.path(), query),
                };
                if let Err(e) = SessionAuthenticator::save_request(&req.get_session(), &target, &chain.session) {
                    log::warn!("Could not save request {}: {}", target, e);
                }
            }
            redirect(login_page.as_str())
        }
        EntryPoint::Forbidden => AuthError::Forbidden.error_response(),
    }
}

fn csrf_failure(error: &CsrfError) -> HttpResponse {
    match error {
        CsrfError::Storage(_) => HttpResponse::InternalServerError().finish(),
        CsrfError::MissingToken | CsrfError::InvalidToken => AuthError::InvalidCsrfToken.error_response(),
    }
}

fn respond<B>(req: ServiceRequest, res: HttpResponse) -> ServiceResponse<EitherBody<B>> {
    req.into_response(res).map_into_right_body()
}
