//! Shared helpers for HTTP-level integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use gd_api::auth::jwt::JwtConfig;
use gd_api::auth::password::hash_password;
use gd_api::config::ServerConfig;
use gd_api::router::build_app_router;
use gd_api::state::AppState;
use gd_core::clock::{Clock, SystemClock};
use gd_core::types::DbId;
use gd_db::models::account::{CreateAdmin, CreateStudent};
use gd_db::repositories::{AdminRepo, StudentRepo};
use gd_pipeline::PipelineSettings;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub const PASSWORD: &str = "test_password_123!";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "postgres://unused".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            admin_secret: "test-admin-secret".to_string(),
            student_secret: "test-student-secret".to_string(),
            expiry_mins: 60,
        },
        sweeper_interval_mins: 30,
        pipeline: PipelineSettings::default(),
    }
}

/// Build the full application router on the real clock.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_clock(pool, Arc::new(SystemClock))
}

/// Build the full application router with an injected clock.
pub fn build_test_app_with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        clock,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_admin(pool: &PgPool, username: &str) -> DbId {
    let input = CreateAdmin {
        username: username.to_string(),
        password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
    };
    AdminRepo::create(pool, &input)
        .await
        .expect("admin creation should succeed")
        .id
}

pub async fn create_student(pool: &PgPool, roll_number: &str, level: i32) -> DbId {
    let input = CreateStudent {
        roll_number: roll_number.to_string(),
        name: format!("Student {roll_number}"),
        password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
        current_gd_level: level,
    };
    StudentRepo::create(pool, &input)
        .await
        .expect("student creation should succeed")
        .id
}

pub async fn admin_token(app: &Router, username: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": PASSWORD });
    let response = post_json(app, "/admin/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["token"].as_str().expect("token").to_string()
}

pub async fn student_token(app: &Router, roll_number: &str) -> String {
    let body = serde_json::json!({ "roll_number": roll_number, "password": PASSWORD });
    let response = post_json(app, "/student/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["token"].as_str().expect("token").to_string()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, empty_request("GET", uri, None)).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("GET", uri, Some(token))).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, json_request("POST", uri, None, body)).await
}

pub async fn post_json_auth(app: &Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, json_request("POST", uri, Some(token), body)).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("POST", uri, Some(token))).await
}

pub async fn put_json_auth(app: &Router, uri: &str, token: &str, body: Value) -> Response {
    send(app, json_request("PUT", uri, Some(token), body)).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response {
    send(app, empty_request("DELETE", uri, Some(token))).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Assert a status and that the error body is exactly `{"error": ...}`.
pub async fn assert_error(response: Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    let object = json.as_object().expect("error body is an object");
    assert_eq!(object.len(), 1, "error body carries only the message: {json}");
    object["error"].as_str().expect("error message").to_string()
}
