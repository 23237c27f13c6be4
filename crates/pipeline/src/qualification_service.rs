//! Qualification records and level progression.

use std::collections::BTreeMap;

use gd_core::error::CoreError;
use gd_core::qualification::{draft_qualifications, level_progress, LevelProgress};
use gd_core::scoring::ScoringOutcome;
use gd_core::types::{DbId, Timestamp};
use gd_db::models::qualification::Qualification;
use gd_db::repositories::{QualificationRepo, StudentRepo};
use gd_db::DbPool;
use sqlx::PgConnection;

use crate::coordinator::SessionCoordinator;
use crate::PipelineResult;

pub struct QualificationService;

impl QualificationService {
    /// Upsert one qualification per ranked participant.
    ///
    /// Approved records are never touched, so re-finalizing cannot
    /// downgrade them. Returns the rows written.
    pub async fn record(
        conn: &mut PgConnection,
        session_id: DbId,
        scoring: &ScoringOutcome,
    ) -> PipelineResult<Vec<Qualification>> {
        let ids: Vec<DbId> = scoring.ranking.iter().map(|row| row.student_id).collect();
        let levels: BTreeMap<DbId, i32> = StudentRepo::levels_for(&mut *conn, &ids)
            .await?
            .into_iter()
            .collect();

        let mut written = Vec::new();
        for draft in draft_qualifications(scoring, &levels) {
            if let Some(q) = QualificationRepo::upsert(
                &mut *conn,
                session_id,
                draft.student_id,
                draft.final_score,
                draft.qualified_for_level,
            )
            .await?
            {
                written.push(q);
            }
        }
        Ok(written)
    }

    /// Approve a qualification and promote the student.
    ///
    /// The student's level becomes `max(current, qualified_for_level)`.
    pub async fn approve(
        pool: &DbPool,
        qualification_id: DbId,
        approver_id: DbId,
        feedback: Option<&str>,
        now: Timestamp,
    ) -> PipelineResult<Qualification> {
        let mut tx = pool.begin().await?;

        let existing = QualificationRepo::lock_by_id(&mut *tx, qualification_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Qualification",
                id: qualification_id,
            })?;
        if existing.is_approved {
            return Err(CoreError::Conflict("Qualification is already approved".to_string()).into());
        }

        let approved =
            QualificationRepo::approve(&mut *tx, qualification_id, approver_id, feedback, now)
                .await?
                .ok_or_else(|| {
                    CoreError::Conflict("Qualification is already approved".to_string())
                })?;

        let new_level =
            StudentRepo::raise_level(&mut *tx, approved.student_id, approved.qualified_for_level)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Student",
                    id: approved.student_id,
                })?;

        tx.commit().await?;

        tracing::info!(
            qualification_id,
            student_id = approved.student_id,
            approver_id,
            new_level,
            "Qualification approved"
        );
        Ok(approved)
    }

    /// Where a student stands on the level ladder.
    pub async fn level_progress(pool: &DbPool, student_id: DbId) -> PipelineResult<LevelProgress> {
        let student = StudentRepo::find_by_id(pool, student_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Student",
                id: student_id,
            })?;
        let facts: Vec<_> = QualificationRepo::list_for_student(pool, student_id)
            .await?
            .iter()
            .map(Qualification::fact)
            .collect();
        Ok(level_progress(student.current_gd_level, &facts))
    }

    /// All qualifications of a session, best score first.
    pub async fn list_for_session(
        pool: &DbPool,
        session_id: DbId,
    ) -> PipelineResult<Vec<Qualification>> {
        SessionCoordinator::require_session(pool, session_id).await?;
        Ok(QualificationRepo::list_for_session(pool, session_id).await?)
    }
}
