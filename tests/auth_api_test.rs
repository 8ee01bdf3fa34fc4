mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
async fn login_issues_a_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "mama@example.com",
                "password": "12345678"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().unwrap_or_default().len() > 20);
    assert_eq!(body["expires_in"], 3600);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({
                "email": "mama@example.com",
                "password": "wrong-password"
            })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/clients", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_rejects_a_garbage_token() {
    let app = TestApp::new().await;

    let response = app
        .request_with_token(Method::GET, "/api/v1/clients", "not-a-real-token")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/clients", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_and_health_stay_open() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}
