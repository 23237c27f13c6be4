//! Repository for the `penalty_events` table.

use gd_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::penalty::{NewPenalty, PenaltyEvent};

const COLUMNS: &str = "id, session_id, student_id, reason, scope, points, created_at";

/// Audit log of timeout and bias penalties.
pub struct PenaltyRepo;

impl PenaltyRepo {
    /// Record a penalty once per (session, student, reason, scope).
    ///
    /// Returns `None` when the event already existed.
    pub async fn record(
        db: impl PgExecutor<'_>,
        input: &NewPenalty,
    ) -> Result<Option<PenaltyEvent>, sqlx::Error> {
        let query = format!(
            "INSERT INTO penalty_events (session_id, student_id, reason, scope, points, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (session_id, student_id, reason, scope) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PenaltyEvent>(&query)
            .bind(input.session_id)
            .bind(input.student_id)
            .bind(&input.reason)
            .bind(&input.scope)
            .bind(input.points)
            .bind(input.created_at)
            .fetch_optional(db)
            .await
    }

    /// Sum of recorded points for one student in a session.
    pub async fn total_for_student(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM penalty_events
             WHERE session_id = $1 AND student_id = $2",
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_one(db)
        .await
    }

    pub async fn list_for_session(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<Vec<PenaltyEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM penalty_events
             WHERE session_id = $1
             ORDER BY student_id, created_at, id"
        );
        sqlx::query_as::<_, PenaltyEvent>(&query)
            .bind(session_id)
            .fetch_all(db)
            .await
    }
}
