//! Loads scoring input from storage and finalizes sessions.
//!
//! The algorithm itself is [`gd_core::scoring::score_session`]; this module
//! only gathers the roster, stored votes, penalties and ranking points, and
//! persists what finalization produces.

use gd_core::error::CoreError;
use gd_core::penalty::{PenaltyReason, SESSION_SCOPE};
use gd_core::scoring::{
    score_session, DisqualificationReason, PenaltyRecord, ScoringConfig, ScoringOutcome, Vote,
};
use gd_core::session::SessionStatus;
use gd_core::types::{DbId, Timestamp};
use gd_db::models::penalty::{NewPenalty, PenaltyEvent};
use gd_db::models::qualification::Qualification;
use gd_db::models::session::GdSession;
use gd_db::repositories::{
    GdSessionRepo, PenaltyRepo, QualificationRepo, RankingPointsRepo, SessionParticipantRepo,
    SurveyResultRepo,
};
use gd_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;

use crate::coordinator::SessionCoordinator;
use crate::qualification_service::QualificationService;
use crate::PipelineResult;

/// What [`ScoringService::finalize`] did.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    Finalized {
        session: GdSession,
        scoring: ScoringOutcome,
        qualifications: Vec<Qualification>,
    },
    /// The session was already completed; nothing changed.
    AlreadyCompleted,
}

/// Admin view of a session's scores.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResults {
    pub session_id: DbId,
    pub level: i32,
    pub status: String,
    #[serde(flatten)]
    pub scoring: ScoringOutcome,
    pub penalties: Vec<PenaltyEvent>,
}

/// A student's own standing in a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct StudentResult {
    pub session_id: DbId,
    pub student_id: DbId,
    pub position: Option<usize>,
    pub participant_count: usize,
    pub raw: f64,
    pub penalty: i32,
    pub final_score: f64,
    pub first_place_votes: i64,
    pub disqualified: bool,
    pub disqualification_reasons: Vec<DisqualificationReason>,
    pub qualification: Option<Qualification>,
}

pub struct ScoringService;

impl ScoringService {
    /// Score a session from its stored data.
    pub async fn compute(
        conn: &mut PgConnection,
        session: &GdSession,
        config: &ScoringConfig,
    ) -> PipelineResult<ScoringOutcome> {
        let roster = SessionParticipantRepo::roster(&mut *conn, session.id).await?;
        let votes: Vec<Vote> = SurveyResultRepo::votes_for_session(&mut *conn, session.id)
            .await?
            .into_iter()
            .map(|row| Vote {
                responder_id: row.responder_id,
                question_number: row.question_number,
                ranked_student_id: row.ranked_student_id,
                rank: row.rank,
                weight: row.weight,
            })
            .collect();
        let penalties: Vec<PenaltyRecord> = PenaltyRepo::list_for_session(&mut *conn, session.id)
            .await?
            .into_iter()
            .map(|event| PenaltyRecord {
                student_id: event.student_id,
                points: event.points,
            })
            .collect();
        let points = RankingPointsRepo::points_for_level(&mut *conn, session.level).await?;

        Ok(score_session(&roster, &votes, &penalties, &points, config)?)
    }

    /// Live scoring of any session, for admins.
    pub async fn session_results(
        pool: &DbPool,
        session_id: DbId,
        config: &ScoringConfig,
    ) -> PipelineResult<SessionResults> {
        let mut conn = pool.acquire().await?;
        let session = SessionCoordinator::require_session(&mut *conn, session_id).await?;
        let scoring = Self::compute(&mut *conn, &session, config).await?;
        let penalties = PenaltyRepo::list_for_session(&mut *conn, session_id).await?;

        Ok(SessionResults {
            session_id,
            level: session.level,
            status: session.status.clone(),
            scoring,
            penalties,
        })
    }

    /// A participant's own result. Available once the session is completed.
    pub async fn student_result(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        config: &ScoringConfig,
    ) -> PipelineResult<StudentResult> {
        let mut conn = pool.acquire().await?;
        let session = SessionCoordinator::require_session(&mut *conn, session_id).await?;
        SessionCoordinator::require_participant(&mut *conn, session_id, student_id).await?;
        if session.status()? != SessionStatus::Completed {
            return Err(CoreError::Validation(
                "Results are available once the session is completed".to_string(),
            )
            .into());
        }

        let scoring = Self::compute(&mut *conn, &session, config).await?;
        let qualification = QualificationRepo::find_for(&mut *conn, session_id, student_id).await?;
        let participant_count = scoring.ranking.len() + scoring.disqualified.len();

        let result = if let Some(row) = scoring.ranking.iter().find(|r| r.student_id == student_id) {
            StudentResult {
                session_id,
                student_id,
                position: Some(row.position),
                participant_count,
                raw: row.raw,
                penalty: row.penalty,
                final_score: row.final_score,
                first_place_votes: row.first_place_votes,
                disqualified: false,
                disqualification_reasons: Vec::new(),
                qualification,
            }
        } else {
            let dq = scoring
                .disqualified
                .iter()
                .find(|d| d.student_id == student_id);
            StudentResult {
                session_id,
                student_id,
                position: None,
                participant_count,
                raw: dq.map_or(0.0, |d| d.raw),
                penalty: dq.map_or(0, |d| d.recorded_penalty.min(config.max_penalty)),
                final_score: 0.0,
                first_place_votes: 0,
                disqualified: dq.is_some(),
                disqualification_reasons: dq.map(|d| d.reasons.clone()).unwrap_or_default(),
                qualification,
            }
        };
        Ok(result)
    }

    /// Score a session, record qualifications and mark it completed.
    ///
    /// Finalizing a completed session is a no-op; a cancelled (or not yet
    /// active) session cannot be finalized.
    pub async fn finalize(
        pool: &DbPool,
        session_id: DbId,
        now: Timestamp,
        config: &ScoringConfig,
    ) -> PipelineResult<FinalizeOutcome> {
        let mut tx = pool.begin().await?;
        let session = GdSessionRepo::lock_by_id(&mut *tx, session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GdSession",
                id: session_id,
            })?;

        let outcome = Self::finalize_locked(&mut *tx, &session, now, config).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Finalization body. The caller holds the session row lock.
    pub(crate) async fn finalize_locked(
        conn: &mut PgConnection,
        session: &GdSession,
        now: Timestamp,
        config: &ScoringConfig,
    ) -> PipelineResult<FinalizeOutcome> {
        let status = session.status()?;
        if status == SessionStatus::Completed {
            return Ok(FinalizeOutcome::AlreadyCompleted);
        }
        status.validate_transition(SessionStatus::Completed)?;

        let scoring = Self::compute(&mut *conn, session, config).await?;

        for &responder_id in &scoring.biased_responders {
            PenaltyRepo::record(
                &mut *conn,
                &NewPenalty {
                    session_id: session.id,
                    student_id: responder_id,
                    reason: PenaltyReason::ExcessiveRankDeviation.as_str().to_string(),
                    scope: SESSION_SCOPE.to_string(),
                    points: 0,
                    created_at: now,
                },
            )
            .await?;
            tracing::warn!(
                session_id = session.id,
                responder_id,
                "Responder flagged for excessive rank deviation"
            );
        }

        let qualifications = QualificationService::record(&mut *conn, session.id, &scoring).await?;

        let session = GdSessionRepo::update_status(&mut *conn, session.id, SessionStatus::Completed)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GdSession",
                id: session.id,
            })?;

        tracing::info!(
            session_id = session.id,
            ranked = scoring.ranking.len(),
            disqualified = scoring.disqualified.len(),
            qualifications = qualifications.len(),
            "Session finalized"
        );

        Ok(FinalizeOutcome::Finalized {
            session,
            scoring,
            qualifications,
        })
    }
}
