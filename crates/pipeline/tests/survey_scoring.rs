//! Integration tests for the survey engine, scoring, finalization,
//! qualifications and the sweeper jobs.

mod common;

use std::collections::BTreeMap;

use assert_matches::assert_matches;
use common::{admin, at, question, student, t0, venue};
use gd_core::error::CoreError;
use gd_core::session::{Agenda, SessionStatus};
use gd_core::timer::TimerScope;
use gd_core::types::DbId;
use gd_db::models::session::BulkCreateSessions;
use gd_db::repositories::{
    GdSessionRepo, PenaltyRepo, QualificationRepo, SessionParticipantRepo, StudentRepo,
    SurveyResultRepo,
};
use gd_pipeline::scoring_service::FinalizeOutcome;
use gd_pipeline::survey_engine::SurveySubmission;
use gd_pipeline::{
    sweeper, PipelineError, PipelineSettings, QualificationService, ScoringService,
    SessionCoordinator, SurveyEngine,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rank the same students for every question `1..=questions`.
fn ranking(questions: u32, ranked: &[DbId]) -> SurveySubmission {
    let ranks: BTreeMap<i32, DbId> = ranked
        .iter()
        .enumerate()
        .map(|(i, &id)| (i as i32 + 1, id))
        .collect();
    SurveySubmission {
        responses: (1..=questions).map(|q| (q, ranks.clone())).collect(),
        is_partial: false,
        is_final: true,
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_questions_fall_back_and_are_stable_per_student(pool: PgPool) {
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let session_id = common::session_with(&pool, &[a, b]).await;

    let first = SurveyEngine::questions_for_student(&pool, session_id, a, None).await.unwrap();
    let again = SurveyEngine::questions_for_student(&pool, session_id, a, Some(1)).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first.len(), 5);
    assert!(first.iter().all(|q| q.question_id.is_none() && q.weight == 1.0));

    let mut numbers: Vec<u32> = first.iter().map(|q| q.question_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

    let err = SurveyEngine::questions_for_student(&pool, session_id, a, Some(2))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Scoring end to end
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_three_way_ranking_finalizes_with_weighted_totals(pool: PgPool) {
    question(&pool, "Clarity", 1.0, 1).await;
    question(&pool, "Leadership", 2.0, 2).await;
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let c = student(&pool, "C", 1).await;
    let session_id = common::session_with(&pool, &[a, b, c]).await;
    let settings = PipelineSettings::default();

    let out = SurveyEngine::submit(&pool, session_id, a, &ranking(2, &[b, c]), at(30), &settings)
        .await
        .unwrap();
    assert_eq!(out.rows_saved, 4);
    assert!(!out.finalized);
    SurveyEngine::submit(&pool, session_id, b, &ranking(2, &[a, c]), at(30), &settings)
        .await
        .unwrap();
    let last = SurveyEngine::submit(&pool, session_id, c, &ranking(2, &[a, b]), at(31), &settings)
        .await
        .unwrap();
    assert!(last.finalized);

    let session = GdSessionRepo::find_by_id(&pool, session_id).await.unwrap().unwrap();
    assert_eq!(session.status().unwrap(), SessionStatus::Completed);

    let results = ScoringService::session_results(&pool, session_id, &settings.scoring)
        .await
        .unwrap();
    let order: Vec<(DbId, f64)> = results
        .scoring
        .ranking
        .iter()
        .map(|r| (r.student_id, r.final_score))
        .collect();
    assert_eq!(order, vec![(a, 24.0), (b, 21.0), (c, 18.0)]);
    assert!(results.scoring.disqualified.is_empty());

    let quals = QualificationService::list_for_session(&pool, session_id).await.unwrap();
    assert_eq!(quals.len(), 3);
    assert!(quals.iter().all(|q| q.qualified_for_level == 2 && !q.is_approved));

    let mine = ScoringService::student_result(&pool, session_id, b, &settings.scoring)
        .await
        .unwrap();
    assert_eq!(mine.position, Some(2));
    assert_eq!(mine.final_score, 21.0);
    assert!(mine.qualification.is_some());

    // Finalizing again changes nothing.
    let again = ScoringService::finalize(&pool, session_id, at(40), &settings.scoring)
        .await
        .unwrap();
    assert_matches!(again, FinalizeOutcome::AlreadyCompleted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_resubmission_replaces_rows_and_partial_does_not_complete(pool: PgPool) {
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let c = student(&pool, "C", 1).await;
    let session_id = common::session_with(&pool, &[a, b, c]).await;
    let settings = PipelineSettings::default();

    let mut partial = ranking(2, &[b, c]);
    partial.is_final = false;
    partial.is_partial = true;
    SurveyEngine::submit(&pool, session_id, a, &partial, at(30), &settings)
        .await
        .unwrap();
    SurveyEngine::submit(&pool, session_id, a, &partial, at(30), &settings)
        .await
        .unwrap();

    let rows = SurveyResultRepo::list_for_responder(&pool, session_id, a).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| !r.is_completed));

    let status = SurveyEngine::completion(&pool, session_id, a).await.unwrap();
    assert!(!status.completed);
    assert_eq!(status.participant_count, 3);

    SurveyEngine::submit(&pool, session_id, a, &ranking(5, &[c, b]), at(31), &settings)
        .await
        .unwrap();
    let rows = SurveyResultRepo::list_for_responder(&pool, session_id, a).await.unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.is_completed));
    let status = SurveyEngine::completion(&pool, session_id, a).await.unwrap();
    assert!(status.completed);
    assert_eq!(status.completed_count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submission_validation(pool: PgPool) {
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let outsider = student(&pool, "X", 1).await;
    let session_id = common::session_with(&pool, &[a, b]).await;
    let settings = PipelineSettings::default();

    let mut both = ranking(1, &[b]);
    both.is_partial = true;
    let err = SurveyEngine::submit(&pool, session_id, a, &both, at(30), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    let err = SurveyEngine::submit(&pool, session_id, a, &ranking(1, &[a]), at(30), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    let err = SurveyEngine::submit(&pool, session_id, a, &ranking(1, &[outsider]), at(30), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    let err = SurveyEngine::submit(&pool, session_id, a, &ranking(6, &[b]), at(30), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));

    let err = SurveyEngine::submit(&pool, session_id, outsider, &ranking(1, &[a]), at(30), &settings)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Forbidden(_)));

    assert!(SurveyResultRepo::list_for_responder(&pool, session_id, a)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Timers and penalties
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_timeout_penalties_cap_then_disqualify(pool: PgPool) {
    let d = student(&pool, "D", 1).await;
    let e = student(&pool, "E", 1).await;
    let session_id = common::session_with(&pool, &[d, e]).await;
    let settings = PipelineSettings::default();

    // Default agenda: 20 discussion minutes over 5 fallback questions.
    for k in 1..=4 {
        SurveyEngine::start_timer(&pool, session_id, d, TimerScope::Question(k), at(10))
            .await
            .unwrap();
    }

    let early = SurveyEngine::apply_penalty(&pool, session_id, d, TimerScope::Question(1), at(13), &settings)
        .await
        .unwrap_err();
    assert_matches!(early, PipelineError::Core(CoreError::Validation(_)));

    let polled = SurveyEngine::check_timeout(&pool, session_id, d, TimerScope::Question(1), at(14))
        .await
        .unwrap();
    assert!(polled.status.expired);
    assert_eq!(polled.status.limit_ms, 240_000);

    let mut outcomes = Vec::new();
    for k in 1..=4 {
        let outcome =
            SurveyEngine::apply_penalty(&pool, session_id, d, TimerScope::Question(k), at(14), &settings)
                .await
                .unwrap();
        outcomes.push((outcome.total_points, outcome.applied_points, outcome.disqualified));
    }
    assert_eq!(
        outcomes,
        vec![(1, 1, false), (2, 2, false), (3, 3, false), (4, 3, true)]
    );

    let repeat =
        SurveyEngine::apply_penalty(&pool, session_id, d, TimerScope::Question(1), at(15), &settings)
            .await
            .unwrap();
    assert!(!repeat.recorded);
    assert_eq!(repeat.total_points, 4);

    let unstarted =
        SurveyEngine::apply_penalty(&pool, session_id, d, TimerScope::Overall, at(15), &settings)
            .await
            .unwrap_err();
    assert_matches!(unstarted, PipelineError::Core(CoreError::Validation(_)));

    assert_eq!(PenaltyRepo::total_for_student(&pool, session_id, d).await.unwrap(), 4);

    // The disqualified student drops out of the ranking.
    SurveyEngine::submit(&pool, session_id, e, &ranking(5, &[d]), at(20), &settings)
        .await
        .unwrap();
    let results = ScoringService::session_results(&pool, session_id, &settings.scoring)
        .await
        .unwrap();
    assert!(results.scoring.ranking.iter().all(|r| r.student_id != d));
    assert!(results.scoring.disqualified.iter().any(|x| x.student_id == d));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_zero_discussion_time_expires_question_timer_immediately(pool: PgPool) {
    let venue_id = venue(&pool, "Hall Z", 10, 1).await;
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let settings = PipelineSettings::default();

    let sessions = SessionCoordinator::create_sessions_bulk(
        &pool,
        &BulkCreateSessions {
            venue_ids: vec![venue_id],
            start_time: t0(),
            duration_minutes: 30,
            topic: Some("Remote work".to_string()),
            agenda: Some(Agenda {
                prep_minutes: 5,
                discussion_minutes: 0,
                survey_minutes: 10,
            }),
            survey_weights: BTreeMap::new(),
        },
    )
    .await
    .unwrap();
    let session_id = sessions[0].id;
    for id in [a, b] {
        SessionParticipantRepo::add(&pool, session_id, id, false, t0()).await.unwrap();
    }
    SessionCoordinator::update_status(&pool, session_id, SessionStatus::Active, t0(), &settings)
        .await
        .unwrap();

    let started = SurveyEngine::start_timer(&pool, session_id, a, TimerScope::Question(1), t0())
        .await
        .unwrap();
    assert!(started.status.expired);
    assert_eq!(started.status.limit_ms, 0);

    let outcome =
        SurveyEngine::apply_penalty(&pool, session_id, a, TimerScope::Question(1), t0(), &settings)
            .await
            .unwrap();
    assert!(outcome.recorded);
    assert_eq!(outcome.total_points, 1);
}

// ---------------------------------------------------------------------------
// Qualifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approval_promotes_and_is_not_downgraded(pool: PgPool) {
    let approver = admin(&pool, "head").await;
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let session_id = common::session_with(&pool, &[a, b]).await;
    let settings = PipelineSettings::default();

    SurveyEngine::submit(&pool, session_id, a, &ranking(5, &[b]), at(30), &settings)
        .await
        .unwrap();
    let out = SurveyEngine::submit(&pool, session_id, b, &ranking(5, &[a]), at(30), &settings)
        .await
        .unwrap();
    assert!(out.finalized);

    let progress = QualificationService::level_progress(&pool, a).await.unwrap();
    assert_eq!(progress.current_level, 1);
    assert_eq!(progress.pending_level, Some(2));

    let qual = QualificationRepo::find_for(&pool, session_id, a).await.unwrap().unwrap();
    let approved = QualificationService::approve(&pool, qual.id, approver, Some("Strong"), at(60))
        .await
        .unwrap();
    assert!(approved.is_approved);
    assert_eq!(approved.feedback.as_deref(), Some("Strong"));

    let err = QualificationService::approve(&pool, qual.id, approver, None, at(61))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Conflict(_)));

    let promoted = StudentRepo::find_by_id(&pool, a).await.unwrap().unwrap();
    assert_eq!(promoted.current_gd_level, 2);

    let progress = QualificationService::level_progress(&pool, a).await.unwrap();
    assert_eq!(progress.current_level, 2);
    assert_eq!(progress.highest_approved_level, Some(2));
    assert_eq!(progress.pending_qualification_id, None);
}

// ---------------------------------------------------------------------------
// Sweeper
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sweep_purges_phases_and_finalizes_overdue(pool: PgPool) {
    let a = student(&pool, "A", 1).await;
    let b = student(&pool, "B", 1).await;
    let session_id = common::session_with(&pool, &[a, b]).await;
    let settings = PipelineSettings::default();

    // Session ends at t0 + 35; grace is 15 minutes.
    let early = sweeper::sweep(&pool, at(45), &settings).await.unwrap();
    assert_eq!(early.sessions_finalized, 0);

    let report = sweeper::sweep(&pool, at(61), &settings).await.unwrap();
    assert_eq!(report.phases_purged, 2);
    assert_eq!(report.sessions_finalized, 1);

    let session = GdSessionRepo::find_by_id(&pool, session_id).await.unwrap().unwrap();
    assert_eq!(session.status().unwrap(), SessionStatus::Completed);

    let again = sweeper::sweep(&pool, at(120), &settings).await.unwrap();
    assert_eq!(again, sweeper::SweepReport::default());
}
