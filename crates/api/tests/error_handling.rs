//! `AppError` to HTTP response mapping, without a server.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use gd_api::error::AppError;
use gd_core::error::CoreError;
use gd_pipeline::PipelineError;
use http_body_util::BodyExt;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Venue",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, serde_json::json!({ "error": "Venue with id 42 not found" }));
}

#[tokio::test]
async fn missing_error_returns_404() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Missing("QR token expired".into()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "QR token expired");
}

#[tokio::test]
async fn capacity_exhausted_returns_403() {
    let (status, json) = error_to_response(AppError::Core(CoreError::CapacityExhausted(
        "QR code capacity reached".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "QR code capacity reached");
}

#[tokio::test]
async fn validation_and_bad_request_return_400() {
    let (status, _) = error_to_response(AppError::Core(CoreError::Validation("x".into()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = error_to_response(AppError::BadRequest("bad field".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad field");
}

#[tokio::test]
async fn auth_errors_map_to_401_and_403() {
    let (status, _) =
        error_to_response(AppError::Core(CoreError::Unauthorized("no".into()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = error_to_response(AppError::Core(CoreError::Forbidden("no".into()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn conflict_error_returns_409() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Conflict("already booked".into()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "already booked");
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let (status, json) = error_to_response(AppError::Core(CoreError::Internal(
        "corrupt status column".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");

    let (status, json) = error_to_response(AppError::Database(sqlx::Error::PoolTimedOut)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, _) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pipeline_errors_keep_their_kind() {
    let err: AppError = PipelineError::Core(CoreError::Conflict("dup".into())).into();
    let (status, _) = error_to_response(err).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let err: AppError = PipelineError::Database(sqlx::Error::RowNotFound).into();
    let (status, _) = error_to_response(err).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
