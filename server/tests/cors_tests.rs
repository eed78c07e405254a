//! Cross-origin policy tests.

#[macro_use]
mod common;

use actix_web::http::header;
use actix_web::http::{Method, StatusCode};
use actix_web::test;
use serde_json::json;

use common::{context, FRONTEND_ORIGIN};

#[actix_web::test]
async fn test_frontend_origin_allowed_with_credentials() {
    let app = parking_app!(context());

    let req = test::TestRequest::post()
        .uri("/api/v1/join")
        .insert_header((header::ORIGIN, FRONTEND_ORIGIN))
        .set_json(json!({"username": "cors-user", "password": "pw"}))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND_ORIGIN);
    assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
}

#[actix_web::test]
async fn test_foreign_origin_rejected() {
    let app = parking_app!(context());

    let req = test::TestRequest::get()
        .uri("/confirm?username=user")
        .insert_header((header::ORIGIN, "http://evil.example"))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[actix_web::test]
async fn test_preflight_needs_no_authentication() {
    let app = parking_app!(context());

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/v1/my/profile")
        .insert_header((header::ORIGIN, FRONTEND_ORIGIN))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-requested-with"))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND_ORIGIN);
}

#[actix_web::test]
async fn test_cors_headers_on_redirect_to_login() {
    let app = parking_app!(context());

    let req = test::TestRequest::get()
        .uri("/api/v1/my")
        .insert_header((header::ORIGIN, FRONTEND_ORIGIN))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND_ORIGIN);
}

#[actix_web::test]
async fn test_foreign_origin_cannot_register() {
    let ctx = context();
    let app = parking_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/join")
        .insert_header((header::ORIGIN, "http://evil.example"))
        .set_json(json!({"username": "cross-site", "password": "pw"}))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!ctx.users.user_exists("cross-site"));
}
