//! Student handlers: profile, booking, QR join and session presence.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gd_core::error::CoreError;
use gd_core::level::validate_level;
use gd_core::qualification::LevelProgress;
use gd_core::session::Phase;
use gd_core::types::DbId;
use gd_db::models::account::StudentProfile;
use gd_db::models::session::{GdSession, PresentParticipant, SessionDetails, SessionListing};
use gd_db::repositories::{GdSessionRepo, StudentRepo};
use gd_pipeline::scoring_service::StudentResult;
use gd_pipeline::{QualificationService, ScoringService, SessionCoordinator};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::rbac::RequireStudent;
use crate::query::{LevelParams, SessionIdParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct VenueRequest {
    #[validate(range(min = 1))]
    pub venue_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[validate(length(min = 1, max = 1024))]
    pub qr_data: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PhaseRequest {
    #[validate(range(min = 1))]
    pub session_id: DbId,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub progress: LevelProgress,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub session_id: DbId,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /student/profile
pub async fn profile(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ProfileResponse>>> {
    let student = StudentRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Student",
            id: user.user_id,
        }))?;
    let progress = QualificationService::level_progress(&state.pool, student.id).await?;

    Ok(Json(DataResponse {
        data: ProfileResponse {
            profile: StudentProfile::from(&student),
            progress,
        },
    }))
}

/// GET /student/sessions?level=
///
/// Open sessions with seat counts. Defaults to the student's current level.
pub async fn list_sessions(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LevelParams>,
) -> AppResult<Json<DataResponse<Vec<SessionListing>>>> {
    let level = match params.level {
        Some(level) => level,
        None => StudentRepo::find_by_id(&state.pool, user.user_id)
            .await?
            .map(|s| s.current_gd_level)
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Student",
                id: user.user_id,
            }))?,
    };
    validate_level(level)?;

    let sessions = GdSessionRepo::list_open_for_level(&state.pool, level).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// POST /student/sessions/book
pub async fn book(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<VenueRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GdSession>>)> {
    let session =
        SessionCoordinator::book_venue(&state.pool, user.user_id, input.venue_id, state.now())
            .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// POST /student/sessions/cancel
pub async fn cancel(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<VenueRequest>,
) -> AppResult<StatusCode> {
    SessionCoordinator::cancel_booking(&state.pool, user.user_id, input.venue_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /student/sessions/join
pub async fn join(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<JoinRequest>,
) -> AppResult<Json<DataResponse<JoinResponse>>> {
    let session =
        SessionCoordinator::join_by_qr(&state.pool, user.user_id, &input.qr_data, state.now())
            .await?;
    Ok(Json(DataResponse {
        data: JoinResponse {
            session_id: session.id,
            status: session.status,
        },
    }))
}

/// GET /student/session?session_id=
pub async fn session_details(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SessionIdParams>,
) -> AppResult<Json<DataResponse<SessionDetails>>> {
    let details =
        SessionCoordinator::session_details(&state.pool, params.session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: details }))
}

/// GET /student/session/participants?session_id=
pub async fn participants(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SessionIdParams>,
) -> AppResult<Json<DataResponse<Vec<PresentParticipant>>>> {
    let present = SessionCoordinator::list_present(
        &state.pool,
        params.session_id,
        user.user_id,
        state.now(),
        &state.config.pipeline,
    )
    .await?;
    Ok(Json(DataResponse { data: present }))
}

/// POST /student/session/phase
pub async fn record_phase(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PhaseRequest>,
) -> AppResult<StatusCode> {
    SessionCoordinator::record_phase(
        &state.pool,
        input.session_id,
        user.user_id,
        input.phase,
        state.now(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /student/results?session_id=
pub async fn results(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SessionIdParams>,
) -> AppResult<Json<DataResponse<StudentResult>>> {
    let result = ScoringService::student_result(
        &state.pool,
        params.session_id,
        user.user_id,
        &state.config.pipeline.scoring,
    )
    .await?;
    Ok(Json(DataResponse { data: result }))
}
