//! Shared query parameter types for API handlers.

use gd_core::types::DbId;
use serde::Deserialize;

/// `?session_id=` on student session endpoints.
#[derive(Debug, Deserialize)]
pub struct SessionIdParams {
    pub session_id: DbId,
}

/// `?venue_id=` on QR listing.
#[derive(Debug, Deserialize)]
pub struct VenueIdParams {
    pub venue_id: DbId,
}

/// `?level=` filter. Absent means "the caller's own level" on student routes.
#[derive(Debug, Deserialize)]
pub struct LevelParams {
    pub level: Option<i32>,
}
