//! Repository for the `gd_sessions` table.

use gd_core::session::SessionStatus;
use gd_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::OPEN_SESSION_STATUSES;
use crate::models::session::{CreateGdSession, GdSession, SessionDetails, SessionListing};

const COLUMNS: &str = "id, venue_id, level, status, start_time, end_time, agenda, \
                       survey_weights, qr_group_id, topic, created_at, updated_at";

/// Provides queries for GD sessions.
pub struct GdSessionRepo;

impl GdSessionRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &CreateGdSession,
    ) -> Result<GdSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO gd_sessions
                (venue_id, level, status, start_time, end_time, agenda, survey_weights, qr_group_id, topic)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(input.venue_id)
            .bind(input.level)
            .bind(input.status.as_str())
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(Json(&input.agenda))
            .bind(Json(&input.survey_weights))
            .bind(input.qr_group_id)
            .bind(&input.topic)
            .fetch_one(db)
            .await
    }

    /// Insert the session for a QR group unless another scanner already did.
    ///
    /// Returns `None` when the open-group unique index rejected the row; the
    /// caller re-selects the winner with [`Self::find_open_for_group`].
    pub async fn insert_for_group(
        db: impl PgExecutor<'_>,
        input: &CreateGdSession,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!(
            "INSERT INTO gd_sessions
                (venue_id, level, status, start_time, end_time, agenda, survey_weights, qr_group_id, topic)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (venue_id, qr_group_id) WHERE status IN ('pending', 'active') DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(input.venue_id)
            .bind(input.level)
            .bind(input.status.as_str())
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(Json(&input.agenda))
            .bind(Json(&input.survey_weights))
            .bind(input.qr_group_id)
            .bind(&input.topic)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gd_sessions WHERE id = $1");
        sqlx::query_as::<_, GdSession>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Load and row-lock a session for a status change.
    pub async fn lock_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gd_sessions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, GdSession>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Newest open session bound to a QR group at a venue.
    pub async fn find_open_for_group(
        db: impl PgExecutor<'_>,
        venue_id: DbId,
        qr_group_id: Uuid,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gd_sessions
             WHERE venue_id = $1 AND qr_group_id = $2 AND status IN {OPEN_SESSION_STATUSES}
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(venue_id)
            .bind(qr_group_id)
            .fetch_optional(db)
            .await
    }

    /// Newest pending session at a venue (the one bookings fill).
    pub async fn newest_pending_for_venue(
        db: impl PgExecutor<'_>,
        venue_id: DbId,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gd_sessions
             WHERE venue_id = $1 AND status = 'pending'
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(venue_id)
            .fetch_optional(db)
            .await
    }

    pub async fn update_status(
        db: impl PgExecutor<'_>,
        id: DbId,
        status: SessionStatus,
    ) -> Result<Option<GdSession>, sqlx::Error> {
        let query = format!(
            "UPDATE gd_sessions SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(db)
            .await
    }

    /// Admin listing, newest first, with optional venue and status filters.
    pub async fn list(
        db: impl PgExecutor<'_>,
        venue_id: Option<DbId>,
        status: Option<SessionStatus>,
    ) -> Result<Vec<GdSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gd_sessions
             WHERE ($1::BIGINT IS NULL OR venue_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY start_time DESC, id DESC"
        );
        sqlx::query_as::<_, GdSession>(&query)
            .bind(venue_id)
            .bind(status.map(SessionStatus::as_str))
            .fetch_all(db)
            .await
    }

    /// Pending or active sessions at active venues of `level`, with seat counts.
    pub async fn list_open_for_level(
        db: impl PgExecutor<'_>,
        level: i32,
    ) -> Result<Vec<SessionListing>, sqlx::Error> {
        sqlx::query_as::<_, SessionListing>(
            "SELECT s.id, s.venue_id, v.name AS venue_name, s.level, s.status,
                    s.start_time, s.end_time, s.topic, v.capacity,
                    (SELECT COUNT(*) FROM session_participants sp
                      WHERE sp.session_id = s.id AND NOT sp.is_dummy) AS booked
             FROM gd_sessions s
             JOIN venues v ON v.id = s.venue_id
             WHERE v.level = $1 AND v.is_active AND s.status IN ('pending', 'active')
             ORDER BY s.start_time, s.id",
        )
        .bind(level)
        .fetch_all(db)
        .await
    }

    /// Session joined with its venue name.
    pub async fn details(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<SessionDetails>, sqlx::Error> {
        sqlx::query_as::<_, SessionDetails>(
            "SELECT s.id, s.venue_id, v.name AS venue_name, s.level, s.status,
                    s.start_time, s.end_time, s.topic, s.agenda
             FROM gd_sessions s
             JOIN venues v ON v.id = s.venue_id
             WHERE s.id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Ids of active sessions whose end time is before `cutoff`.
    pub async fn overdue_active(
        db: impl PgExecutor<'_>,
        cutoff: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM gd_sessions
             WHERE status = 'active' AND end_time < $1
             ORDER BY id",
        )
        .bind(cutoff)
        .fetch_all(db)
        .await
    }
}
