//! Router tests that never reach the database
//!
//! Covers route gating, request parsing and response headers using a pool that
//! is never connected.

mod common;

use axum::http::{Method, StatusCode};
use common::{offline_app, send, JWT_SECRET};
use serde_json::json;
use uuid::Uuid;
use yogaguru_shared::{auth::jwt::issue_token_pair, models::user::Role};

fn tokens(role: Role) -> (String, String) {
    let pair = issue_token_pair(Uuid::new_v4(), role, JWT_SECRET).unwrap();
    (pair.access_token, pair.refresh_token)
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = offline_app();

    for (method, uri) in [
        (Method::GET, "/users/me"),
        (Method::POST, "/courses"),
        (Method::PUT, "/courses/00000000-0000-0000-0000-000000000001"),
        (Method::POST, "/enrollments"),
        (Method::GET, "/enrollments/me"),
        (Method::GET, "/enrollments/00000000-0000-0000-0000-000000000001/attendance"),
        (Method::PUT, "/payments/00000000-0000-0000-0000-000000000001/status"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let app = offline_app();
    let (_, refresh) = tokens(Role::Student);

    let (status, _) = send(&app, Method::GET, "/users/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a refresh token is not an access token
    let (status, _) = send(&app, Method::GET, "/users/me", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = issue_token_pair(Uuid::new_v4(), Role::Admin, "another-secret-that-is-32-bytes-long!")
        .unwrap();
    let (status, _) = send(
        &app,
        Method::GET,
        "/users/me",
        Some(&foreign.access_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gates() {
    let app = offline_app();
    let (student, _) = tokens(Role::Student);
    let (instructor, _) = tokens(Role::Instructor);
    let any_id = "00000000-0000-0000-0000-000000000001";

    let (status, body) = send(&app, Method::POST, "/courses", Some(&student), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(&app, Method::GET, "/enrollments/me", Some(&instructor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/users/{}/role", any_id),
        Some(&instructor),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/users/{}", any_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/payments/{}/status", any_id),
        Some(&student),
        Some(json!({ "status": "succeeded" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "phone": 5551234 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_register_validation_happens_before_storage() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "name": "Asha", "phone": "555-1234", "password": "namaste" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "phone");

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "name": "Asha", "phone": "+15551234567", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "name": "   ", "phone": "+15551234567", "password": "namaste" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "name");

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "name": "Asha",
            "phone": "+15551234567",
            "password": "namaste",
            "role": "admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_unknown_enrollment_type_is_bad_request() {
    let app = offline_app();
    let (student, _) = tokens(Role::Student);

    let (status, body) = send(
        &app,
        Method::POST,
        "/enrollments",
        Some(&student),
        Some(json!({ "course_id": Uuid::new_v4(), "enrollment_type": "weekly" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("weekly"));
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = offline_app();
    let (access, _) = tokens(Role::Student);

    let (status, _) = send(
        &app,
        Method::POST,
        "/refresh",
        None,
        Some(json!({ "refresh_token": access })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = offline_app();

    let request = axum::http::Request::builder()
        .uri("/users/me")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers().get("strict-transport-security").is_none());

    let (status, _) = send(&app, Method::GET, "/no-such-route", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
