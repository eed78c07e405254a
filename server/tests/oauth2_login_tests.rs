//! OAuth2 login endpoint tests.
//!
//! The full login runs against a provider stub served on a local port.

#[macro_use]
mod common;

use actix_web::http::header::AUTHORIZATION;
use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

use common::{context, context_for, context_with, location, session_cookie, test_users};
use honors_parking_server::config::{AppConfig, ProviderCredentials};
use honors_parking_server::security_config::SecurityConfig;
use parking_security_core::http::security::{
    ClientRegistration, InMemoryUserDetailsManager, OAuth2Client, OAuth2Provider, User,
};

const STUB_ACCESS_TOKEN: &str = "stub-access-token";

async fn stub_token() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "access_token": STUB_ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600
    }))
}

async fn stub_userinfo(req: HttpRequest) -> HttpResponse {
    let expected = format!("Bearer {}", STUB_ACCESS_TOKEN);
    match req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => HttpResponse::Ok().json(json!({"id": 42, "name": "Choi"})),
        _ => HttpResponse::Unauthorized().finish(),
    }
}

/// Serves the token and userinfo endpoints and returns the base URL.
fn start_provider_stub() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/token", web::post().to(stub_token))
            .route("/userinfo", web::get().to(stub_userinfo))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

fn stub_security(provider_url: &str, users: InMemoryUserDetailsManager) -> SecurityConfig {
    let registration = ClientRegistration::with_provider(OAuth2Provider::Custom, "parking-client", "parking-secret")
        .client_name("Parking ID")
        .authorization_uri(format!("{}/authorize", provider_url))
        .token_uri(format!("{}/token", provider_url))
        .user_info_uri(format!("{}/userinfo", provider_url));
    let client = OAuth2Client::new(registration, "http://localhost:8080").unwrap();

    SecurityConfig::new(&AppConfig::default(), users)
        .unwrap()
        .register_client(client)
}

fn state_of(provider_redirect: &str) -> String {
    url::Url::parse(provider_redirect)
        .unwrap()
        .query_pairs()
        .find(|(name, _)| name == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}

fn naver_config() -> AppConfig {
    AppConfig {
        naver: Some(ProviderCredentials {
            client_id: "naver-client".into(),
            client_secret: "naver-secret".into(),
        }),
        ..AppConfig::default()
    }
}

#[actix_web::test]
async fn test_authorization_redirects_to_provider() {
    let app = parking_app!(context_with(naver_config()));

    let req = test::TestRequest::get().uri("/oauth2/authorization/naver").to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    let target = location(&res);
    assert!(target.starts_with("https://nid.naver.com/oauth2.0/authorize"));
    assert!(target.contains("client_id=naver-client"));
    assert!(target.contains("state="));
    assert!(target.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Flogin%2Foauth2%2Fcode%2Fnaver"));
}

#[actix_web::test]
async fn test_unknown_registration_fails_to_login_page() {
    let app = parking_app!(context());

    let req = test::TestRequest::get().uri("/oauth2/authorization/naver").to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/login?error");
}

#[actix_web::test]
async fn test_callback_with_wrong_state_fails() {
    let app = parking_app!(context_with(naver_config()));

    let req = test::TestRequest::get().uri("/oauth2/authorization/naver").to_request();
    let res = test::call_service(&app, req).await;
    let cookie = session_cookie(&res);

    let req = test::TestRequest::get()
        .uri("/login/oauth2/code/naver?code=abc&state=forged")
        .cookie(cookie)
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/login?error");
}

#[actix_web::test]
async fn test_provider_error_fails_to_login_page() {
    let app = parking_app!(context_with(naver_config()));

    let req = test::TestRequest::get()
        .uri("/login/oauth2/code/naver?error=access_denied")
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/login?error");
}

#[actix_web::test]
async fn test_login_page_lists_configured_providers() {
    let app = parking_app!(context_with(naver_config()));

    let req = test::TestRequest::get().uri("/login").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let html = String::from_utf8_lossy(&body);

    assert!(html.contains(r#"href="/oauth2/authorization/naver""#));
    assert!(html.contains("Login with Naver"));
}

#[actix_web::test]
async fn test_callback_logs_in_social_user() {
    let provider_url = start_provider_stub();
    let ctx = context_for(stub_security(&provider_url, test_users()));
    let app = parking_app!(ctx);

    let req = test::TestRequest::get().uri("/oauth2/authorization/custom").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(location(&res).starts_with(&format!("{}/authorize", provider_url)));
    let state = state_of(&location(&res));

    let req = test::TestRequest::get()
        .uri(&format!("/login/oauth2/code/custom?code=auth-code&state={}", state))
        .cookie(session_cookie(&res))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/api/v1/my");

    let req = test::TestRequest::get()
        .uri("/api/v1/my")
        .cookie(session_cookie(&res))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"], "custom_42");
    assert_eq!(body["displayName"], "Choi");
    assert_eq!(body["roles"], json!(["USER"]));
    assert!(ctx.users.user_exists("custom_42"));
}

#[actix_web::test]
async fn test_callback_refuses_local_account_with_same_name() {
    let provider_url = start_provider_stub();
    let users = test_users();
    users
        .create_user(User::with_encoded_password("custom_42", "$2b$04$local".to_string()).roles(&["USER".to_string()]))
        .unwrap();
    let app = parking_app!(context_for(stub_security(&provider_url, users)));

    let req = test::TestRequest::get().uri("/oauth2/authorization/custom").to_request();
    let res = test::call_service(&app, req).await;
    let state = state_of(&location(&res));

    let req = test::TestRequest::get()
        .uri(&format!("/login/oauth2/code/custom?code=auth-code&state={}", state))
        .cookie(session_cookie(&res))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/login?error");
}
