//! Repository for the `venues` table.

use gd_core::types::DbId;
use gd_core::venue::VenueUsage;
use sqlx::PgExecutor;

use super::OPEN_SESSION_STATUSES;
use crate::models::venue::{CreateVenue, UpdateVenue, Venue};

const COLUMNS: &str = "id, name, capacity, level, is_active, created_at, updated_at";

/// Provides CRUD operations for venues.
pub struct VenueRepo;

impl VenueRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateVenue) -> Result<Venue, sqlx::Error> {
        let query = format!(
            "INSERT INTO venues (name, capacity, level)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Venue>(&query)
            .bind(&input.name)
            .bind(input.capacity)
            .bind(input.level)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Venue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM venues WHERE id = $1");
        sqlx::query_as::<_, Venue>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Load and row-lock a venue. Serializes capacity checks at the venue.
    pub async fn lock_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Venue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM venues WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Venue>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// List venues ordered by level then name, optionally filtered by level.
    pub async fn list(db: impl PgExecutor<'_>, level: Option<i32>) -> Result<Vec<Venue>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM venues
             WHERE ($1::INTEGER IS NULL OR level = $1)
             ORDER BY level, name, id"
        );
        sqlx::query_as::<_, Venue>(&query)
            .bind(level)
            .fetch_all(db)
            .await
    }

    /// Apply a partial update. Returns `None` if the venue does not exist.
    pub async fn update(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateVenue,
    ) -> Result<Option<Venue>, sqlx::Error> {
        let query = format!(
            "UPDATE venues SET
                name = COALESCE($2, name),
                capacity = COALESCE($3, capacity),
                level = COALESCE($4, level),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Venue>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.capacity)
            .bind(input.level)
            .bind(input.is_active)
            .fetch_optional(db)
            .await
    }

    /// Session count and active bookings at a venue.
    pub async fn usage(db: impl PgExecutor<'_>, venue: &Venue) -> Result<VenueUsage, sqlx::Error> {
        let query = format!(
            "SELECT
                (SELECT COUNT(*) FROM gd_sessions WHERE venue_id = $1),
                (SELECT COUNT(*) FROM session_participants sp
                   JOIN gd_sessions s ON s.id = sp.session_id
                  WHERE s.venue_id = $1 AND s.status IN {OPEN_SESSION_STATUSES}
                    AND NOT sp.is_dummy)"
        );
        let (session_count, active_bookings) = sqlx::query_as::<_, (i64, i64)>(&query)
            .bind(venue.id)
            .fetch_one(db)
            .await?;

        Ok(VenueUsage {
            level: venue.level,
            capacity: venue.capacity,
            session_count,
            active_bookings,
        })
    }
}
