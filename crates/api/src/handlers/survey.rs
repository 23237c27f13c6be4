//! Student survey handlers: questions, timers, penalties and submission.

use axum::extract::State;
use axum::Json;
use gd_core::penalty::PenaltyOutcome;
use gd_core::survey::{NumberedQuestion, SurveyResponses};
use gd_core::timer::TimerScope;
use gd_core::types::DbId;
use gd_pipeline::survey_engine::{CompletionStatus, SubmitOutcome, SurveySubmission, TimerView};
use gd_pipeline::SurveyEngine;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiQuery, ValidJson};
use crate::middleware::rbac::RequireStudent;
use crate::query::SessionIdParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// `?session_id=&level=` for the question list. `level`, when given, must
/// match the session level.
#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    pub session_id: DbId,
    pub level: Option<i32>,
}

/// Timer addressed by session and scope (`overall` or `question:<k>`).
#[derive(Debug, Deserialize, Validate)]
pub struct TimerRequest {
    #[validate(range(min = 1))]
    pub session_id: DbId,
    #[validate(length(min = 1, max = 32))]
    pub scope: String,
}

/// Request body for `POST /student/survey`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitSurveyRequest {
    #[validate(range(min = 1))]
    pub session_id: DbId,
    pub responses: SurveyResponses,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub is_final: bool,
}

/// GET /student/questions?session_id=&level=
pub async fn questions(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<QuestionParams>,
) -> AppResult<Json<DataResponse<Vec<NumberedQuestion>>>> {
    let questions = SurveyEngine::questions_for_student(
        &state.pool,
        params.session_id,
        user.user_id,
        params.level,
    )
    .await?;
    Ok(Json(DataResponse { data: questions }))
}

/// POST /student/survey
pub async fn submit(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<SubmitSurveyRequest>,
) -> AppResult<Json<DataResponse<SubmitOutcome>>> {
    let submission = SurveySubmission {
        responses: input.responses,
        is_partial: input.is_partial,
        is_final: input.is_final,
    };
    let outcome = SurveyEngine::submit(
        &state.pool,
        input.session_id,
        user.user_id,
        &submission,
        state.now(),
        &state.config.pipeline,
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /student/survey/completion?session_id=
pub async fn completion(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SessionIdParams>,
) -> AppResult<Json<DataResponse<CompletionStatus>>> {
    let status = SurveyEngine::completion(&state.pool, params.session_id, user.user_id).await?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /student/survey/timer/start
///
/// Idempotent: a second start returns the original instant.
pub async fn start_timer(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<TimerRequest>,
) -> AppResult<Json<DataResponse<TimerView>>> {
    let scope: TimerScope = input.scope.parse()?;
    let view = SurveyEngine::start_timer(
        &state.pool,
        input.session_id,
        user.user_id,
        scope,
        state.now(),
    )
    .await?;
    Ok(Json(DataResponse { data: view }))
}

/// GET /student/survey/timer?session_id=&scope=
pub async fn check_timer(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TimerRequest>,
) -> AppResult<Json<DataResponse<TimerView>>> {
    let scope: TimerScope = params.scope.parse()?;
    let view = SurveyEngine::check_timeout(
        &state.pool,
        params.session_id,
        user.user_id,
        scope,
        state.now(),
    )
    .await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /student/survey/penalty
pub async fn apply_penalty(
    RequireStudent(user): RequireStudent,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<TimerRequest>,
) -> AppResult<Json<DataResponse<PenaltyOutcome>>> {
    let scope: TimerScope = input.scope.parse()?;
    let outcome = SurveyEngine::apply_penalty(
        &state.pool,
        input.session_id,
        user.user_id,
        scope,
        state.now(),
        &state.config.pipeline,
    )
    .await?;
    Ok(Json(DataResponse { data: outcome }))
}
