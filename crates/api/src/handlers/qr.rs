//! Handlers for `/admin/qr`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gd_core::types::{DbId, Timestamp};
use gd_db::models::qr_token::QrToken;
use gd_pipeline::QrTokenService;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::ApiQuery;
use crate::middleware::rbac::RequireAdmin;
use crate::query::VenueIdParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query for `GET /admin/qr`.
#[derive(Debug, Deserialize)]
pub struct IssueParams {
    pub venue_id: DbId,
    /// Minutes, 1..=1440. Defaults to 15.
    pub validity: Option<i64>,
    /// Defaults to the venue capacity.
    pub max_capacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DeactivateParams {
    pub qr_id: DbId,
}

/// What the issuing admin displays. Token and group ids stay server-side.
#[derive(Debug, Serialize)]
pub struct IssuedQr {
    pub qr_data: String,
    pub expires_at: Timestamp,
    pub max_capacity: i32,
}

/// GET /admin/qr?venue_id=&validity=&max_capacity=
pub async fn issue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<IssueParams>,
) -> AppResult<Json<DataResponse<IssuedQr>>> {
    let token = QrTokenService::issue(
        &state.pool,
        params.venue_id,
        params.validity,
        params.max_capacity,
        admin.user_id,
        state.now(),
    )
    .await?;

    Ok(Json(DataResponse {
        data: IssuedQr {
            qr_data: token.payload,
            expires_at: token.expires_at,
            max_capacity: token.max_capacity,
        },
    }))
}

/// GET /admin/qr/list?venue_id=
pub async fn list_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<VenueIdParams>,
) -> AppResult<Json<DataResponse<Vec<QrToken>>>> {
    let tokens =
        QrTokenService::list_active(&state.pool, params.venue_id, admin.user_id, state.now())
            .await?;
    Ok(Json(DataResponse { data: tokens }))
}

/// POST /admin/qr/deactivate?qr_id=
pub async fn deactivate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DeactivateParams>,
) -> AppResult<StatusCode> {
    QrTokenService::deactivate(&state.pool, params.qr_id, admin.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
