//! Repository for the `phase_tracking` table.

use gd_core::session::Phase;
use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::session::PhaseEntry;

const COLUMNS: &str = "id, session_id, student_id, phase, started_at";

/// Liveness heartbeats per (session, student, phase).
pub struct PhaseTrackingRepo;

impl PhaseTrackingRepo {
    /// Insert or refresh a phase entry with `started_at = at`.
    pub async fn upsert(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        phase: Phase,
        at: Timestamp,
    ) -> Result<PhaseEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO phase_tracking (session_id, student_id, phase, started_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, student_id, phase)
             DO UPDATE SET started_at = EXCLUDED.started_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhaseEntry>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(phase.as_str())
            .bind(at)
            .fetch_one(db)
            .await
    }

    /// Drop every phase entry of a student, across all sessions.
    pub async fn delete_for_student(
        db: impl PgExecutor<'_>,
        student_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM phase_tracking WHERE student_id = $1")
            .bind(student_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop a session's entries that started before `cutoff`.
    pub async fn prune_session(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM phase_tracking WHERE session_id = $1 AND started_at < $2")
                .bind(session_id)
                .bind(cutoff)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }

    /// Drop every entry that started before `cutoff`.
    pub async fn purge_older_than(
        db: impl PgExecutor<'_>,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM phase_tracking WHERE started_at < $1")
            .bind(cutoff)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_for_student(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Vec<PhaseEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM phase_tracking
             WHERE session_id = $1 AND student_id = $2
             ORDER BY started_at"
        );
        sqlx::query_as::<_, PhaseEntry>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_all(db)
            .await
    }
}
