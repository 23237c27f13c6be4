//! Handlers for `/admin/venues`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gd_core::error::CoreError;
use gd_core::level::validate_level;
use gd_core::types::DbId;
use gd_core::venue::{validate_new_venue, validate_venue_update};
use gd_db::models::venue::{CreateVenue, UpdateVenue, Venue};
use gd_db::repositories::VenueRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::rbac::RequireAdmin;
use crate::query::LevelParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/venues?level=
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LevelParams>,
) -> AppResult<Json<DataResponse<Vec<Venue>>>> {
    if let Some(level) = params.level {
        validate_level(level)?;
    }
    let venues = VenueRepo::list(&state.pool, params.level).await?;
    Ok(Json(DataResponse { data: venues }))
}

/// POST /admin/venues
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateVenue>,
) -> AppResult<(StatusCode, Json<DataResponse<Venue>>)> {
    validate_new_venue(&input.name, input.capacity, input.level)?;
    let venue = VenueRepo::create(&state.pool, &input).await?;
    tracing::info!(venue_id = venue.id, admin_id = admin.user_id, "Venue created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: venue })))
}

/// PUT /admin/venues/{id}
///
/// The venue row is locked while its usage is checked so a concurrent
/// booking cannot slip in between the check and the write.
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateVenue>,
) -> AppResult<Json<DataResponse<Venue>>> {
    let mut tx = state.pool.begin().await?;

    let venue = VenueRepo::lock_by_id(&mut *tx, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Venue", id }))?;
    let usage = VenueRepo::usage(&mut *tx, &venue).await?;
    validate_venue_update(
        &usage,
        input.name.as_deref(),
        input.capacity,
        input.level,
    )?;

    let updated = VenueRepo::update(&mut *tx, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Venue", id }))?;
    tx.commit().await?;

    tracing::info!(venue_id = id, admin_id = admin.user_id, "Venue updated");
    Ok(Json(DataResponse { data: updated }))
}
