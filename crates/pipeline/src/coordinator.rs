//! Session coordinator: bookings, QR joins, presence and status changes.
//!
//! Cross-request coordination lives entirely in PostgreSQL: bookings lock
//! the student and venue rows, QR admission is a conditional increment and
//! concurrent first scanners collapse onto one session through the
//! open-group unique index.

use chrono::Duration;
use gd_core::error::CoreError;
use gd_core::session::{presence_cutoff, Agenda, Phase, SessionStatus, BOOKING_WINDOW_MINS};
use gd_core::survey::validate_weight;
use gd_core::types::{DbId, Timestamp};
use gd_db::models::session::{
    BulkCreateSessions, CreateGdSession, GdSession, PresentParticipant, SessionDetails,
};
use gd_db::repositories::{
    GdSessionRepo, PhaseTrackingRepo, SessionParticipantRepo, StudentRepo, VenueRepo,
};
use gd_db::DbPool;
use sqlx::PgConnection;

use crate::qr_service::QrTokenService;
use crate::scoring_service::{FinalizeOutcome, ScoringService};
use crate::{PipelineResult, PipelineSettings};

/// Longest session a bulk request may schedule.
const MAX_SESSION_MINUTES: i64 = 24 * 60;

pub struct SessionCoordinator;

impl SessionCoordinator {
    // -----------------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------------

    /// Book a seat for `student_id` in the venue's pending session.
    ///
    /// Locks the student row first, then the venue row. Creates the pending
    /// session when the venue has none.
    pub async fn book_venue(
        pool: &DbPool,
        student_id: DbId,
        venue_id: DbId,
        now: Timestamp,
    ) -> PipelineResult<GdSession> {
        let mut tx = pool.begin().await?;

        let student = StudentRepo::lock_by_id(&mut *tx, student_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Student",
                id: student_id,
            })?;
        let venue = VenueRepo::lock_by_id(&mut *tx, venue_id)
            .await?
            .filter(|v| v.is_active)
            .ok_or(CoreError::NotFound {
                entity: "Venue",
                id: venue_id,
            })?;

        if student.current_gd_level != venue.level {
            return Err(CoreError::Forbidden(format!(
                "Venue is for level {}, you are at level {}",
                venue.level, student.current_gd_level
            ))
            .into());
        }
        if SessionParticipantRepo::is_booked_at_venue(&mut *tx, student_id, venue_id).await? {
            return Err(CoreError::Conflict("Already booked at this venue".to_string()).into());
        }
        if SessionParticipantRepo::has_active_booking(&mut *tx, student_id).await? {
            return Err(
                CoreError::Forbidden("Student already has an active booking".to_string()).into(),
            );
        }

        let session = match GdSessionRepo::newest_pending_for_venue(&mut *tx, venue_id).await? {
            Some(session) => session,
            None => {
                GdSessionRepo::create(
                    &mut *tx,
                    &CreateGdSession {
                        venue_id,
                        level: venue.level,
                        status: SessionStatus::Pending,
                        start_time: now,
                        end_time: now + Duration::minutes(BOOKING_WINDOW_MINS),
                        agenda: Agenda::default(),
                        survey_weights: Default::default(),
                        qr_group_id: None,
                        topic: None,
                    },
                )
                .await?
            }
        };

        let booked = SessionParticipantRepo::count_non_dummy(&mut *tx, session.id).await?;
        if booked >= i64::from(venue.capacity) {
            return Err(CoreError::CapacityExhausted("Venue is fully booked".to_string()).into());
        }

        SessionParticipantRepo::add(&mut *tx, session.id, student_id, false, now).await?;
        tx.commit().await?;

        tracing::info!(student_id, venue_id, session_id = session.id, "Venue booked");
        Ok(session)
    }

    /// Cancel the student's booking in the venue's pending session.
    pub async fn cancel_booking(
        pool: &DbPool,
        student_id: DbId,
        venue_id: DbId,
    ) -> PipelineResult<()> {
        let removed = SessionParticipantRepo::cancel_bookings(pool, student_id, venue_id).await?;
        if removed == 0 {
            return Err(CoreError::Missing("No active booking at this venue".to_string()).into());
        }
        tracing::info!(student_id, venue_id, "Booking cancelled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // QR join
    // -----------------------------------------------------------------------

    /// Join the session bound to a scanned QR token.
    ///
    /// One transaction: any failure rolls back the seat consumption too. A
    /// student re-scanning a token for a session they are already in does
    /// not consume another seat.
    pub async fn join_by_qr(
        pool: &DbPool,
        student_id: DbId,
        qr_data: &str,
        now: Timestamp,
    ) -> PipelineResult<GdSession> {
        let mut tx = pool.begin().await?;

        let token = QrTokenService::resolve(&mut *tx, qr_data, now).await?;

        let student = StudentRepo::find_by_id(&mut *tx, student_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Student",
                id: student_id,
            })?;
        let venue = VenueRepo::find_by_id(&mut *tx, token.venue_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Venue",
                id: token.venue_id,
            })?;
        if student.current_gd_level != venue.level {
            return Err(CoreError::Forbidden(format!(
                "This QR code is for level {} students",
                venue.level
            ))
            .into());
        }

        let existing =
            GdSessionRepo::find_open_for_group(&mut *tx, venue.id, token.group_id).await?;
        let already_joined = match &existing {
            Some(session) => SessionParticipantRepo::find(&mut *tx, session.id, student_id)
                .await?
                .is_some(),
            None => false,
        };
        if !already_joined {
            QrTokenService::admit(&mut *tx, token.token_id).await?;
        }

        let session = match existing {
            Some(session) => session,
            None => {
                Self::open_group_session(&mut *tx, venue.id, venue.level, token.group_id, now)
                    .await?
            }
        };

        PhaseTrackingRepo::delete_for_student(&mut *tx, student_id).await?;
        SessionParticipantRepo::add(&mut *tx, session.id, student_id, false, now).await?;
        PhaseTrackingRepo::upsert(&mut *tx, session.id, student_id, Phase::Prep, now).await?;

        let session = match session.status()? {
            SessionStatus::Pending | SessionStatus::Lobby => {
                GdSessionRepo::update_status(&mut *tx, session.id, SessionStatus::Active)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "GdSession",
                        id: session.id,
                    })?
            }
            _ => session,
        };

        tx.commit().await?;

        tracing::info!(
            student_id,
            session_id = session.id,
            venue_id = venue.id,
            token_id = token.token_id,
            rescan = already_joined,
            "Student joined session via QR"
        );
        Ok(session)
    }

    /// Create the active session for a QR group, or pick up the one a
    /// concurrent scanner created first.
    async fn open_group_session(
        conn: &mut PgConnection,
        venue_id: DbId,
        level: i32,
        group_id: uuid::Uuid,
        now: Timestamp,
    ) -> PipelineResult<GdSession> {
        let agenda = Agenda::default();
        let input = CreateGdSession {
            venue_id,
            level,
            status: SessionStatus::Active,
            start_time: now,
            end_time: now + Duration::minutes(agenda.total_minutes()),
            agenda,
            survey_weights: Default::default(),
            qr_group_id: Some(group_id),
            topic: None,
        };

        if let Some(session) = GdSessionRepo::insert_for_group(&mut *conn, &input).await? {
            tracing::debug!(session_id = session.id, venue_id, "Opened session for QR group");
            return Ok(session);
        }

        GdSessionRepo::find_open_for_group(&mut *conn, venue_id, group_id)
            .await?
            .ok_or_else(|| {
                CoreError::Internal("Open session for QR group vanished after conflict".to_string())
                    .into()
            })
    }

    // -----------------------------------------------------------------------
    // Participant views
    // -----------------------------------------------------------------------

    /// Session details for one of its (non-dummy) participants.
    pub async fn session_details(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
    ) -> PipelineResult<SessionDetails> {
        let details = GdSessionRepo::details(pool, session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GdSession",
                id: session_id,
            })?;

        let participant = SessionParticipantRepo::find(pool, session_id, student_id).await?;
        if !participant.is_some_and(|p| !p.is_dummy) {
            return Err(
                CoreError::Forbidden("You are not a participant of this session".to_string())
                    .into(),
            );
        }
        Ok(details)
    }

    /// Participants seen within the liveness window, excluding the asker.
    ///
    /// Prunes the session's phase entries older than the retention first.
    pub async fn list_present(
        pool: &DbPool,
        session_id: DbId,
        asker_id: DbId,
        now: Timestamp,
        settings: &PipelineSettings,
    ) -> PipelineResult<Vec<PresentParticipant>> {
        Self::require_session(pool, session_id).await?;
        Self::require_participant(pool, session_id, asker_id).await?;

        let retention_cutoff = now - Duration::minutes(settings.phase_retention_mins);
        let pruned = PhaseTrackingRepo::prune_session(pool, session_id, retention_cutoff).await?;
        if pruned > 0 {
            tracing::debug!(session_id, pruned, "Pruned stale phase entries");
        }

        let cutoff = presence_cutoff(now, settings.liveness_window_mins);
        Ok(SessionParticipantRepo::list_present(pool, session_id, asker_id, cutoff).await?)
    }

    /// Liveness heartbeat: record that the student is in `phase` now.
    pub async fn record_phase(
        pool: &DbPool,
        session_id: DbId,
        student_id: DbId,
        phase: Phase,
        now: Timestamp,
    ) -> PipelineResult<()> {
        let session = Self::require_session(pool, session_id).await?;
        if session.status()? != SessionStatus::Active {
            return Err(CoreError::Validation("Session is not active".to_string()).into());
        }
        Self::require_participant(pool, session_id, student_id).await?;

        PhaseTrackingRepo::upsert(pool, session_id, student_id, phase, now).await?;
        tracing::debug!(session_id, student_id, phase = %phase, "Phase recorded");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Admin operations
    // -----------------------------------------------------------------------

    /// Move a session along the state machine. Completing runs finalization.
    pub async fn update_status(
        pool: &DbPool,
        session_id: DbId,
        target: SessionStatus,
        now: Timestamp,
        settings: &PipelineSettings,
    ) -> PipelineResult<GdSession> {
        let mut tx = pool.begin().await?;

        let session = GdSessionRepo::lock_by_id(&mut *tx, session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GdSession",
                id: session_id,
            })?;
        let current = session.status()?;
        current.validate_transition(target)?;

        let updated = if target == SessionStatus::Completed {
            match ScoringService::finalize_locked(&mut *tx, &session, now, &settings.scoring).await? {
                FinalizeOutcome::Finalized { session, .. } => session,
                FinalizeOutcome::AlreadyCompleted => session,
            }
        } else {
            GdSessionRepo::update_status(&mut *tx, session_id, target)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "GdSession",
                    id: session_id,
                })?
        };

        tx.commit().await?;

        tracing::info!(session_id, from = %current, to = %target, "Session status updated");
        Ok(updated)
    }

    /// Schedule one pending session per listed venue.
    pub async fn create_sessions_bulk(
        pool: &DbPool,
        input: &BulkCreateSessions,
    ) -> PipelineResult<Vec<GdSession>> {
        if input.venue_ids.is_empty() {
            return Err(CoreError::Validation("venue_ids must not be empty".to_string()).into());
        }
        if !(1..=MAX_SESSION_MINUTES).contains(&input.duration_minutes) {
            return Err(CoreError::Validation(format!(
                "duration_minutes must be between 1 and {MAX_SESSION_MINUTES}"
            ))
            .into());
        }
        let agenda = input.agenda.unwrap_or_default();
        agenda.check()?;
        for (question_id, weight) in &input.survey_weights {
            if question_id.parse::<DbId>().is_err() {
                return Err(CoreError::Validation(format!(
                    "survey_weights key '{question_id}' is not a question id"
                ))
                .into());
            }
            validate_weight(*weight)?;
        }

        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(input.venue_ids.len());

        for &venue_id in &input.venue_ids {
            let venue = VenueRepo::find_by_id(&mut *tx, venue_id)
                .await?
                .filter(|v| v.is_active)
                .ok_or(CoreError::NotFound {
                    entity: "Venue",
                    id: venue_id,
                })?;

            let session = GdSessionRepo::create(
                &mut *tx,
                &CreateGdSession {
                    venue_id,
                    level: venue.level,
                    status: SessionStatus::Pending,
                    start_time: input.start_time,
                    end_time: input.start_time + Duration::minutes(input.duration_minutes),
                    agenda,
                    survey_weights: input.survey_weights.clone(),
                    qr_group_id: None,
                    topic: input.topic.clone(),
                },
            )
            .await?;
            created.push(session);
        }

        tx.commit().await?;

        tracing::info!(count = created.len(), "Sessions created in bulk");
        Ok(created)
    }

    // -----------------------------------------------------------------------
    // Shared guards
    // -----------------------------------------------------------------------

    pub(crate) async fn require_session(
        db: impl sqlx::PgExecutor<'_>,
        session_id: DbId,
    ) -> PipelineResult<GdSession> {
        Ok(GdSessionRepo::find_by_id(db, session_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GdSession",
                id: session_id,
            })?)
    }

    pub(crate) async fn require_participant(
        db: impl sqlx::PgExecutor<'_>,
        session_id: DbId,
        student_id: DbId,
    ) -> PipelineResult<()> {
        match SessionParticipantRepo::find(db, session_id, student_id).await? {
            Some(_) => Ok(()),
            None => Err(
                CoreError::Forbidden("You are not a participant of this session".to_string())
                    .into(),
            ),
        }
    }
}
