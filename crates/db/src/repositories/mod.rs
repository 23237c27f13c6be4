//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods take an [`sqlx::PgExecutor`] as the first argument, so callers
//! pass `&PgPool` or `&mut *tx`.

pub mod account_repo;
pub mod penalty_repo;
pub mod phase_tracking_repo;
pub mod qr_token_repo;
pub mod qualification_repo;
pub mod question_repo;
pub mod ranking_points_repo;
pub mod session_participant_repo;
pub mod session_repo;
pub mod survey_completion_repo;
pub mod survey_result_repo;
pub mod survey_timer_repo;
pub mod venue_repo;

/// Session statuses in which a non-dummy participant holds an active
/// booking. QR scans may also still join sessions in these statuses.
pub(crate) const OPEN_SESSION_STATUSES: &str = "('pending', 'lobby', 'active')";

pub use account_repo::{AdminRepo, StudentRepo};
pub use penalty_repo::PenaltyRepo;
pub use phase_tracking_repo::PhaseTrackingRepo;
pub use qr_token_repo::QrTokenRepo;
pub use qualification_repo::QualificationRepo;
pub use question_repo::QuestionRepo;
pub use ranking_points_repo::RankingPointsRepo;
pub use session_participant_repo::SessionParticipantRepo;
pub use session_repo::GdSessionRepo;
pub use survey_completion_repo::SurveyCompletionRepo;
pub use survey_result_repo::SurveyResultRepo;
pub use survey_timer_repo::SurveyTimerRepo;
pub use venue_repo::VenueRepo;
