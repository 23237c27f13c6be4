//! Repository for the `survey_results` table.

use gd_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::survey::{NewSurveyResult, SurveyResult, VoteRow};

const COLUMNS: &str = "id, session_id, responder_id, question_number, question_id, \
                       ranked_student_id, rank, weight, score, is_current_session, \
                       is_completed, created_at";

/// Stored peer rankings.
pub struct SurveyResultRepo;

impl SurveyResultRepo {
    /// Remove a responder's answers for one question before re-inserting them.
    pub async fn delete_for_question(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        responder_id: DbId,
        question_number: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM survey_results
             WHERE session_id = $1 AND responder_id = $2 AND question_number = $3",
        )
        .bind(session_id)
        .bind(responder_id)
        .bind(question_number)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert(
        db: impl PgExecutor<'_>,
        input: &NewSurveyResult,
    ) -> Result<SurveyResult, sqlx::Error> {
        let query = format!(
            "INSERT INTO survey_results
                (session_id, responder_id, question_number, question_id, ranked_student_id,
                 rank, weight, score, is_current_session, is_completed, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SurveyResult>(&query)
            .bind(input.session_id)
            .bind(input.responder_id)
            .bind(input.question_number)
            .bind(input.question_id)
            .bind(input.ranked_student_id)
            .bind(input.rank)
            .bind(input.weight)
            .bind(input.score)
            .bind(input.is_completed)
            .bind(input.created_at)
            .fetch_one(db)
            .await
    }

    /// Mark every row of a responder in a session as completed.
    pub async fn mark_completed(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        responder_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE survey_results SET is_completed = true
             WHERE session_id = $1 AND responder_id = $2 AND NOT is_completed",
        )
        .bind(session_id)
        .bind(responder_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Scoring input for a session, in a stable order.
    pub async fn votes_for_session(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<Vec<VoteRow>, sqlx::Error> {
        sqlx::query_as::<_, VoteRow>(
            "SELECT responder_id, question_number, ranked_student_id, rank, weight
             FROM survey_results
             WHERE session_id = $1 AND is_current_session
             ORDER BY responder_id, question_number, rank",
        )
        .bind(session_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_for_responder(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        responder_id: DbId,
    ) -> Result<Vec<SurveyResult>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM survey_results
             WHERE session_id = $1 AND responder_id = $2
             ORDER BY question_number, rank"
        );
        sqlx::query_as::<_, SurveyResult>(&query)
            .bind(session_id)
            .bind(responder_id)
            .fetch_all(db)
            .await
    }
}
