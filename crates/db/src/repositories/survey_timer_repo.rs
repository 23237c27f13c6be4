//! Repository for the `survey_timers` table.

use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::survey::SurveyTimer;

const COLUMNS: &str = "id, session_id, student_id, scope, started_at";

/// Persisted survey timer starts.
pub struct SurveyTimerRepo;

impl SurveyTimerRepo {
    /// Start a timer. A timer that already exists keeps its original start.
    pub async fn start(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        scope: &str,
        at: Timestamp,
    ) -> Result<SurveyTimer, sqlx::Error> {
        let query = format!(
            "INSERT INTO survey_timers (session_id, student_id, scope, started_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, student_id, scope)
             DO UPDATE SET started_at = survey_timers.started_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SurveyTimer>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(scope)
            .bind(at)
            .fetch_one(db)
            .await
    }

    pub async fn find(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        scope: &str,
    ) -> Result<Option<SurveyTimer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM survey_timers
             WHERE session_id = $1 AND student_id = $2 AND scope = $3"
        );
        sqlx::query_as::<_, SurveyTimer>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(scope)
            .fetch_optional(db)
            .await
    }
}
