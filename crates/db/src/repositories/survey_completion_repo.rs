//! Repository for the `survey_completions` table.

use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::survey::SurveyCompletion;

const COLUMNS: &str = "id, session_id, student_id, completed_at";

/// Per-responder "final submission received" markers.
pub struct SurveyCompletionRepo;

impl SurveyCompletionRepo {
    /// Write the marker once; later calls keep the first timestamp.
    pub async fn mark(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        at: Timestamp,
    ) -> Result<SurveyCompletion, sqlx::Error> {
        let query = format!(
            "INSERT INTO survey_completions (session_id, student_id, completed_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (session_id, student_id)
             DO UPDATE SET completed_at = survey_completions.completed_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SurveyCompletion>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(at)
            .fetch_one(db)
            .await
    }

    pub async fn find(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Option<SurveyCompletion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM survey_completions WHERE session_id = $1 AND student_id = $2"
        );
        sqlx::query_as::<_, SurveyCompletion>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_optional(db)
            .await
    }

    /// Number of non-dummy participants with a marker.
    pub async fn count_completed(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM survey_completions sc
             JOIN session_participants sp
               ON sp.session_id = sc.session_id AND sp.student_id = sc.student_id
             WHERE sc.session_id = $1 AND NOT sp.is_dummy",
        )
        .bind(session_id)
        .fetch_one(db)
        .await
    }

    /// Whether every non-dummy participant has a marker (and there is at
    /// least one such participant).
    pub async fn all_completed(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                    SELECT 1 FROM session_participants
                    WHERE session_id = $1 AND NOT is_dummy)
               AND NOT EXISTS (
                    SELECT 1 FROM session_participants sp
                    LEFT JOIN survey_completions sc
                      ON sc.session_id = sp.session_id AND sc.student_id = sp.student_id
                    WHERE sp.session_id = $1 AND NOT sp.is_dummy AND sc.id IS NULL)",
        )
        .bind(session_id)
        .fetch_one(db)
        .await
    }
}
