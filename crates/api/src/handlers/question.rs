//! Handlers for `/admin/questions`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gd_core::error::CoreError;
use gd_core::level::validate_level;
use gd_core::survey::validate_weight;
use gd_core::types::DbId;
use gd_db::models::survey::{CreateQuestion, SurveyQuestion, UpdateQuestion};
use gd_db::repositories::QuestionRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn check_levels(levels: &[i32]) -> Result<(), CoreError> {
    levels.iter().try_for_each(|&level| validate_level(level))
}

/// GET /admin/questions
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SurveyQuestion>>>> {
    let questions = QuestionRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: questions }))
}

/// POST /admin/questions
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateQuestion>,
) -> AppResult<(StatusCode, Json<DataResponse<SurveyQuestion>>)> {
    validate_weight(input.weight)?;
    check_levels(&input.levels)?;
    let question = QuestionRepo::create(&state.pool, &input).await?;
    tracing::info!(question_id = question.id, admin_id = admin.user_id, "Survey question created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: question })))
}

/// PUT /admin/questions/{id}
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateQuestion>,
) -> AppResult<Json<DataResponse<SurveyQuestion>>> {
    if let Some(weight) = input.weight {
        validate_weight(weight)?;
    }
    if let Some(levels) = &input.levels {
        check_levels(levels)?;
    }
    let question = QuestionRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "SurveyQuestion",
            id,
        }))?;
    Ok(Json(DataResponse { data: question }))
}

/// DELETE /admin/questions/{id}
///
/// Stored results keep their question number and weight snapshot.
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<StatusCode> {
    if QuestionRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "SurveyQuestion",
            id,
        }))
    }
}
