//! Handlers for `/admin/qualifications`.

use axum::extract::State;
use axum::Json;
use gd_core::types::DbId;
use gd_db::models::qualification::{ApproveQualification, Qualification};
use gd_pipeline::QualificationService;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /admin/qualifications/{id}/approve
///
/// Approving promotes the student in the same transaction.
pub async fn approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<ApproveQualification>,
) -> AppResult<Json<DataResponse<Qualification>>> {
    let qualification = QualificationService::approve(
        &state.pool,
        id,
        admin.user_id,
        input.feedback.as_deref(),
        state.now(),
    )
    .await?;
    Ok(Json(DataResponse {
        data: qualification,
    }))
}
