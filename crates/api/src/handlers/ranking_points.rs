//! Handlers for `/admin/ranking-points`.

use axum::extract::State;
use axum::Json;
use gd_core::level::validate_level;
use gd_core::survey::RankingPoints;
use gd_db::models::survey::RankingPointsConfig;
use gd_db::repositories::RankingPointsRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /admin/ranking-points/{level}`.
#[derive(Debug, Deserialize, Validate)]
pub struct RankingPointsRequest {
    #[validate(range(min = 1))]
    pub first_pts: i32,
    #[validate(range(min = 1))]
    pub second_pts: i32,
    #[validate(range(min = 1))]
    pub third_pts: i32,
}

/// GET /admin/ranking-points
///
/// Levels without a row score with the default (4, 3, 2).
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<RankingPointsConfig>>>> {
    let configs = RankingPointsRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: configs }))
}

/// PUT /admin/ranking-points/{level}
pub async fn upsert(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(level): ApiPath<i32>,
    ValidJson(input): ValidJson<RankingPointsRequest>,
) -> AppResult<Json<DataResponse<RankingPointsConfig>>> {
    validate_level(level)?;
    let points = RankingPoints {
        first_pts: input.first_pts,
        second_pts: input.second_pts,
        third_pts: input.third_pts,
    };
    points.validate()?;
    let config = RankingPointsRepo::upsert(&state.pool, level, &points).await?;
    tracing::info!(level, admin_id = admin.user_id, "Ranking points updated");
    Ok(Json(DataResponse { data: config }))
}
