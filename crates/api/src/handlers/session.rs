//! Admin handlers for `/admin/sessions`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gd_core::error::CoreError;
use gd_core::session::SessionStatus;
use gd_core::types::DbId;
use gd_db::models::qualification::Qualification;
use gd_db::models::session::{BulkCreateSessions, GdSession};
use gd_db::repositories::GdSessionRepo;
use gd_pipeline::scoring_service::SessionResults;
use gd_pipeline::{QualificationService, ScoringService, SessionCoordinator};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Filters for `GET /admin/sessions`.
#[derive(Debug, Deserialize)]
pub struct SessionFilter {
    pub venue_id: Option<DbId>,
    pub status: Option<String>,
}

/// Request body for `PUT /admin/sessions/{id}/status`.
#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    #[validate(length(min = 1, max = 32))]
    pub status: String,
}

/// GET /admin/sessions?venue_id=&status=
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<SessionFilter>,
) -> AppResult<Json<DataResponse<Vec<GdSession>>>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<SessionStatus>)
        .transpose()?;
    let sessions = GdSessionRepo::list(&state.pool, filter.venue_id, status).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /admin/sessions/{id}
pub async fn get_by_id(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<GdSession>>> {
    let session = GdSessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Session",
            id,
        }))?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /admin/sessions/bulk
pub async fn bulk_create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<BulkCreateSessions>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<GdSession>>>)> {
    let sessions = SessionCoordinator::create_sessions_bulk(&state.pool, &input).await?;
    tracing::info!(
        admin_id = admin.user_id,
        count = sessions.len(),
        "Sessions created in bulk"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: sessions })))
}

/// PUT /admin/sessions/{id}/status
///
/// Moving a session to `completed` finalizes its scores.
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<StatusUpdateRequest>,
) -> AppResult<Json<DataResponse<GdSession>>> {
    let target: SessionStatus = input.status.parse()?;
    let session = SessionCoordinator::update_status(
        &state.pool,
        id,
        target,
        state.now(),
        &state.config.pipeline,
    )
    .await?;
    tracing::info!(
        session_id = id,
        admin_id = admin.user_id,
        status = %target,
        "Session status changed by admin"
    );
    Ok(Json(DataResponse { data: session }))
}

/// GET /admin/sessions/{id}/results
pub async fn results(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<SessionResults>>> {
    let results =
        ScoringService::session_results(&state.pool, id, &state.config.pipeline.scoring).await?;
    Ok(Json(DataResponse { data: results }))
}

/// GET /admin/sessions/{id}/qualifications
pub async fn qualifications(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<Qualification>>>> {
    let qualifications = QualificationService::list_for_session(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: qualifications,
    }))
}
