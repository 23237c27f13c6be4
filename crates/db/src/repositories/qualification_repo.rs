//! Repository for the `qualifications` table.

use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::qualification::Qualification;

const COLUMNS: &str = "id, session_id, student_id, final_score, qualified_for_level, \
                       is_approved, approved_by, feedback, approved_at, created_at, updated_at";

/// Qualification records produced by scoring.
pub struct QualificationRepo;

impl QualificationRepo {
    /// Insert or refresh an unapproved qualification.
    ///
    /// Approved rows are left untouched; `None` is returned for them.
    pub async fn upsert(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
        final_score: f64,
        qualified_for_level: i32,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!(
            "INSERT INTO qualifications (session_id, student_id, final_score, qualified_for_level)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (session_id, student_id) DO UPDATE SET
                final_score = EXCLUDED.final_score,
                qualified_for_level = EXCLUDED.qualified_for_level,
                updated_at = NOW()
             WHERE NOT qualifications.is_approved
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(final_score)
            .bind(qualified_for_level)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM qualifications WHERE id = $1");
        sqlx::query_as::<_, Qualification>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn lock_by_id(
        db: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM qualifications WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Qualification>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_for(
        db: impl PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qualifications WHERE session_id = $1 AND student_id = $2"
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_optional(db)
            .await
    }

    /// Mark approved. Returns `None` if the row was already approved.
    pub async fn approve(
        db: impl PgExecutor<'_>,
        id: DbId,
        approver_id: DbId,
        feedback: Option<&str>,
        at: Timestamp,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!(
            "UPDATE qualifications SET
                is_approved = true,
                approved_by = $2,
                feedback = $3,
                approved_at = $4,
                updated_at = NOW()
             WHERE id = $1 AND NOT is_approved
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(id)
            .bind(approver_id)
            .bind(feedback)
            .bind(at)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_session(
        db: impl PgExecutor<'_>,
        session_id: DbId,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qualifications
             WHERE session_id = $1
             ORDER BY final_score DESC, student_id"
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(session_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_for_student(
        db: impl PgExecutor<'_>,
        student_id: DbId,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qualifications
             WHERE student_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(student_id)
            .fetch_all(db)
            .await
    }
}
