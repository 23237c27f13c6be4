//! Repository for the `session_participants` table.

use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use super::OPEN_SESSION_STATUSES;
use crate::models::session::{PresentParticipant, SessionParticipant};

const COLUMNS: &str = "id, session_id, student_id, is_dummy, joined_at";

/// Provides roster and booking queries.
pub struct SessionParticipantRepo;

impl SessionParticipantRepo {
    /// Add a participant unless already present. Returns `true` if inserted.
    pub async fn add(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        is_dummy: bool,
        joined_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO session_participants (session_id, student_id, is_dummy, joined_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, student_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(student_id)
        .bind(is_dummy)
        .bind(joined_at)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Option<SessionParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_participants
             WHERE session_id = $1 AND student_id = $2"
        );
        sqlx::query_as::<_, SessionParticipant>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_session(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<Vec<SessionParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_participants
             WHERE session_id = $1
             ORDER BY student_id"
        );
        sqlx::query_as::<_, SessionParticipant>(&query)
            .bind(session_id)
            .fetch_all(db)
            .await
    }

    /// Non-dummy participant ids, ascending.
    pub async fn roster(db: impl PgExecutor<'_>, session_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT student_id FROM session_participants
             WHERE session_id = $1 AND NOT is_dummy
             ORDER BY student_id",
        )
        .bind(session_id)
        .fetch_all(db)
        .await
    }

    pub async fn count_non_dummy(db: impl PgExecutor<'_>, session_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM session_participants WHERE session_id = $1 AND NOT is_dummy",
        )
        .bind(session_id)
        .fetch_one(db)
        .await
    }

    /// Whether the student holds an active booking at the venue.
    pub async fn is_booked_at_venue(
        db: impl PgExecutor<'_>,
        student_id: DbId,
        venue_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (
                SELECT 1 FROM session_participants sp
                JOIN gd_sessions s ON s.id = sp.session_id
                WHERE sp.student_id = $1 AND s.venue_id = $2
                  AND s.status IN {OPEN_SESSION_STATUSES} AND NOT sp.is_dummy)"
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(student_id)
            .bind(venue_id)
            .fetch_one(db)
            .await
    }

    /// Whether the student holds an active booking anywhere: a non-dummy
    /// seat in a pending, lobby or active session.
    pub async fn has_active_booking(
        db: impl PgExecutor<'_>,
        student_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (
                SELECT 1 FROM session_participants sp
                JOIN gd_sessions s ON s.id = sp.session_id
                WHERE sp.student_id = $1
                  AND s.status IN {OPEN_SESSION_STATUSES} AND NOT sp.is_dummy)"
        );
        sqlx::query_scalar::<_, bool>(&query)
            .bind(student_id)
            .fetch_one(db)
            .await
    }

    /// Remove the student's bookings in pending sessions at a venue.
    pub async fn cancel_bookings(
        db: impl PgExecutor<'_>,
        student_id: DbId,
        venue_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM session_participants sp
             USING gd_sessions s
             WHERE s.id = sp.session_id AND sp.student_id = $1
               AND s.venue_id = $2 AND s.status = 'pending'",
        )
        .bind(student_id)
        .bind(venue_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Non-dummy participants with a phase entry newer than `cutoff`,
    /// excluding `exclude_student_id`, ordered by student id.
    pub async fn list_present(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        exclude_student_id: DbId,
        cutoff: Timestamp,
    ) -> Result<Vec<PresentParticipant>, sqlx::Error> {
        sqlx::query_as::<_, PresentParticipant>(
            "SELECT DISTINCT ON (st.id)
                    st.id AS student_id, st.name, st.roll_number,
                    pt.phase, pt.started_at AS last_seen
             FROM session_participants sp
             JOIN students st ON st.id = sp.student_id
             JOIN phase_tracking pt
               ON pt.session_id = sp.session_id AND pt.student_id = sp.student_id
             WHERE sp.session_id = $1 AND NOT sp.is_dummy
               AND sp.student_id <> $2 AND pt.started_at > $3
             ORDER BY st.id, pt.started_at DESC",
        )
        .bind(session_id)
        .bind(exclude_student_id)
        .bind(cutoff)
        .fetch_all(db)
        .await
    }
}
