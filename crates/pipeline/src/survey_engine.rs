//! Survey engine: questions, timers, timeout penalties and submissions.

use std::collections::BTreeSet;

use gd_core::error::CoreError;
use gd_core::penalty::{self, PenaltyOutcome, PenaltyReason, TIMEOUT_PENALTY_POINTS};
use gd_core::session::SessionStatus;
use gd_core::survey::{
    effective_weight, fallback_questions, personalize, validate_responses, NumberedQuestion,
    SurveyResponses,
};
use gd_core::timer::{timeout_status, TimeoutStatus, TimerScope};
use gd_core::types::{DbId, Timestamp};
use gd_db::models::penalty::NewPenalty;
use gd_db::models::session::GdSession;
use gd_db::models::survey::NewSurveyResult;
use gd_db::repositories::{
    PenaltyRepo, QuestionRepo, RankingPointsRepo, SessionParticipantRepo, SurveyCompletionRepo,
    SurveyResultRepo, SurveyTimerRepo,
};
use gd_db::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::coordinator::SessionCoordinator;
use crate::scoring_service::{FinalizeOutcome, ScoringService};
use crate::{PipelineResult, PipelineSettings};

/// One survey submission from a responder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveySubmission {
    /// question number -> rank -> ranked student id.
    pub responses: SurveyResponses,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub session_id: DbId,
    pub questions_saved: usize,
    pub rows_saved: usize,
    pub is_final: bool,
    /// Whether this submission completed the session.
    pub finalized: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerView {
    pub scope: String,
    pub started_at: Option<Timestamp>,
    #[serde(flatten)]
    pub status: TimeoutStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionStatus {
    pub session_id: DbId,
    pub completed: bool,
    pub completed_at: Option<Timestamp>,
    pub completed_count: i64,
    pub participant_count: i64,
}

pub struct SurveyEngine;

impl SurveyEngine {
    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    /// The session's questions in canonical order, numbered 1..n.
    ///
    /// Falls back to the built-in set when no stored question applies to the
    /// session level. Session weight overrides replace stored weights.
    pub async fn canonical_questions(
        conn: &mut PgConnection,
        session: &GdSession,
    ) -> PipelineResult<Vec<NumberedQuestion>> {
        let stored = QuestionRepo::list_for_level(&mut *conn, session.level).await?;
        if stored.is_empty() {
            return Ok(fallback_questions());
        }
        Ok(stored
            .into_iter()
            .enumerate()
            .map(|(i, q)| NumberedQuestion {
                question_number: i as u32 + 1,
                question_id: Some(q.id),
                weight: session.weight_override(q.id).unwrap_or(q.weight),
                text: q.text,
            })
            .collect())
    }

    /// The questions as this student sees them: a stable per-student
    /// permutation of the canonical list.
    pub async fn questions_for_student(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        level: Option<i32>,
    ) -> PipelineResult<Vec<NumberedQuestion>> {
        let mut conn = pool.acquire().await?;
        let session = SessionCoordinator::require_session(&mut *conn, session_id).await?;
        if let Some(level) = level {
            if level != session.level {
                return Err(CoreError::Validation(format!(
                    "Session is level {}, not level {level}",
                    session.level
                ))
                .into());
            }
        }
        SessionCoordinator::require_participant(&mut *conn, session_id, student_id).await?;

        let questions = Self::canonical_questions(&mut *conn, &session).await?;
        Ok(personalize(questions, student_id, session_id))
    }

    // -----------------------------------------------------------------------
    // Timers and penalties
    // -----------------------------------------------------------------------

    /// Start a timer. Starting an already started timer keeps the original
    /// instant.
    pub async fn start_timer(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        scope: TimerScope,
        now: Timestamp,
    ) -> PipelineResult<TimerView> {
        let mut conn = pool.acquire().await?;
        let (session, limit_ms) =
            Self::timer_context(&mut *conn, session_id, student_id, scope).await?;
        if session.status()? != SessionStatus::Active {
            return Err(CoreError::Validation("Session is not active".to_string()).into());
        }

        let timer =
            SurveyTimerRepo::start(&mut *conn, session_id, student_id, &scope.to_string(), now)
                .await?;
        tracing::debug!(session_id, student_id, scope = %scope, "Survey timer started");

        Ok(TimerView {
            scope: scope.to_string(),
            started_at: Some(timer.started_at),
            status: timeout_status(Some(timer.started_at), limit_ms, now),
        })
    }

    /// Poll a timer.
    pub async fn check_timeout(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        scope: TimerScope,
        now: Timestamp,
    ) -> PipelineResult<TimerView> {
        let mut conn = pool.acquire().await?;
        let (_, limit_ms) = Self::timer_context(&mut *conn, session_id, student_id, scope).await?;
        let started_at =
            SurveyTimerRepo::find(&mut *conn, session_id, student_id, &scope.to_string())
                .await?
                .map(|t| t.started_at);

        Ok(TimerView {
            scope: scope.to_string(),
            started_at,
            status: timeout_status(started_at, limit_ms, now),
        })
    }

    /// Record a timeout penalty for an expired timer.
    ///
    /// Idempotent per scope. Every timeout is recorded; only the capped total
    /// reduces the score, and a recorded total above the cap disqualifies.
    pub async fn apply_penalty(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        scope: TimerScope,
        now: Timestamp,
        settings: &PipelineSettings,
    ) -> PipelineResult<PenaltyOutcome> {
        let mut tx = pool.begin().await?;
        let (_, limit_ms) = Self::timer_context(&mut *tx, session_id, student_id, scope).await?;
        let started_at =
            SurveyTimerRepo::find(&mut *tx, session_id, student_id, &scope.to_string())
                .await?
                .map(|t| t.started_at);

        let status = timeout_status(started_at, limit_ms, now);
        if !status.started {
            return Err(CoreError::Validation(format!("Timer '{scope}' was never started")).into());
        }
        if !status.expired {
            return Err(CoreError::Validation(format!(
                "Timer '{scope}' has not expired ({} ms remaining)",
                status.remaining_ms
            ))
            .into());
        }

        let recorded = PenaltyRepo::record(
            &mut *tx,
            &NewPenalty {
                session_id,
                student_id,
                reason: PenaltyReason::for_scope(scope).as_str().to_string(),
                scope: scope.to_string(),
                points: TIMEOUT_PENALTY_POINTS,
                created_at: now,
            },
        )
        .await?
        .is_some();
        let total = PenaltyRepo::total_for_student(&mut *tx, session_id, student_id).await?;
        tx.commit().await?;

        let total = i32::try_from(total)
            .map_err(|_| CoreError::Internal("Penalty total out of range".to_string()))?;
        let outcome = penalty::outcome(recorded, total, settings.scoring.max_penalty);

        if recorded {
            tracing::info!(
                session_id,
                student_id,
                scope = %scope,
                total_points = outcome.total_points,
                disqualified = outcome.disqualified,
                "Timeout penalty recorded"
            );
        }
        Ok(outcome)
    }

    /// Load the session, check participation and compute a scope's limit.
    async fn timer_context(
        conn: &mut PgConnection,
        session_id: DbId,
        student_id: DbId,
        scope: TimerScope,
    ) -> PipelineResult<(GdSession, i64)> {
        let session = SessionCoordinator::require_session(&mut *conn, session_id).await?;
        SessionCoordinator::require_participant(&mut *conn, session_id, student_id).await?;

        let question_count = Self::canonical_questions(&mut *conn, &session).await?.len();
        scope.validate(question_count)?;
        let limit_ms = scope.limit_ms(&session.agenda.0, question_count);
        Ok((session, limit_ms))
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Store a responder's rankings.
    ///
    /// Submitted questions replace the responder's earlier answers to them.
    /// A final submission marks the responder complete; when that completes
    /// every participant, the session is finalized.
    pub async fn submit(
        pool: &DbPool,
        session_id: DbId,
        responder_id: DbId,
        submission: &SurveySubmission,
        now: Timestamp,
        settings: &PipelineSettings,
    ) -> PipelineResult<SubmitOutcome> {
        if submission.is_partial && submission.is_final {
            return Err(CoreError::Validation(
                "A submission cannot be both partial and final".to_string(),
            )
            .into());
        }

        let mut tx = pool.begin().await?;

        let session = SessionCoordinator::require_session(&mut *tx, session_id).await?;
        SessionCoordinator::require_participant(&mut *tx, session_id, responder_id).await?;
        if session.status()? != SessionStatus::Active {
            return Err(CoreError::Validation("Session is not active".to_string()).into());
        }

        let questions = Self::canonical_questions(&mut *tx, &session).await?;
        let participants: BTreeSet<DbId> =
            SessionParticipantRepo::list_for_session(&mut *tx, session_id)
                .await?
                .into_iter()
                .map(|p| p.student_id)
                .collect();
        validate_responses(
            &submission.responses,
            responder_id,
            questions.len(),
            &participants,
        )?;

        let points = RankingPointsRepo::points_for_level(&mut *tx, session.level).await?;
        let mut rows_saved = 0;

        for (&question_number, ranks) in &submission.responses {
            let question = questions
                .get(question_number as usize - 1)
                .ok_or_else(|| {
                    CoreError::Validation(format!("Unknown question number {question_number}"))
                })?;
            let number = question_number as i32;

            SurveyResultRepo::delete_for_question(&mut *tx, session_id, responder_id, number)
                .await?;

            for (&rank, &ranked_student_id) in ranks {
                let score = f64::from(points.for_rank(rank)?) * effective_weight(question.weight);
                SurveyResultRepo::insert(
                    &mut *tx,
                    &NewSurveyResult {
                        session_id,
                        responder_id,
                        question_number: number,
                        question_id: question.question_id,
                        ranked_student_id,
                        rank,
                        weight: question.weight,
                        score,
                        is_completed: submission.is_final,
                        created_at: now,
                    },
                )
                .await?;
                rows_saved += 1;
            }
        }

        if submission.is_final {
            SurveyResultRepo::mark_completed(&mut *tx, session_id, responder_id).await?;
            SurveyCompletionRepo::mark(&mut *tx, session_id, responder_id, now).await?;
        }

        tx.commit().await?;

        tracing::info!(
            session_id,
            responder_id,
            questions = submission.responses.len(),
            rows_saved,
            is_final = submission.is_final,
            "Survey responses saved"
        );

        let mut finalized = false;
        if submission.is_final && SurveyCompletionRepo::all_completed(pool, session_id).await? {
            match ScoringService::finalize(pool, session_id, now, &settings.scoring).await {
                Ok(outcome) => finalized = matches!(outcome, FinalizeOutcome::Finalized { .. }),
                // Responses are already committed; the sweeper retries overdue sessions.
                Err(e) => tracing::warn!(session_id, error = %e, "Auto-finalization skipped"),
            }
        }

        Ok(SubmitOutcome {
            session_id,
            questions_saved: submission.responses.len(),
            rows_saved,
            is_final: submission.is_final,
            finalized,
        })
    }

    /// Whether the student has submitted a final survey.
    pub async fn completion(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
    ) -> PipelineResult<CompletionStatus> {
        SessionCoordinator::require_session(pool, session_id).await?;
        SessionCoordinator::require_participant(pool, session_id, student_id).await?;

        let marker = SurveyCompletionRepo::find(pool, session_id, student_id).await?;
        let completed_count = SurveyCompletionRepo::count_completed(pool, session_id).await?;
        let participant_count = SessionParticipantRepo::count_non_dummy(pool, session_id).await?;

        Ok(CompletionStatus {
            session_id,
            completed: marker.is_some(),
            completed_at: marker.map(|m| m.completed_at),
            completed_count,
            participant_count,
        })
    }
}
