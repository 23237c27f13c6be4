//! Transactional orchestration of the GD assessment pipeline.
//!
//! Each service is a zero-sized struct whose methods compose the
//! repositories of [`gd_db`] inside PostgreSQL transactions and apply the
//! pure rules of [`gd_core`]:
//!
//! - [`QrTokenService`] issues, validates and admits QR presence tokens.
//! - [`SessionCoordinator`] handles booking, QR joins, presence and status.
//! - [`SurveyEngine`] serves questions, timers, penalties and submissions.
//! - [`ScoringService`] loads scoring input and finalizes sessions.
//! - [`QualificationService`] records, approves and reports qualifications.
//! - [`sweeper`] holds the idempotent background jobs.
//!
//! Every time-dependent method takes `now` explicitly.

use gd_core::error::CoreError;
use gd_core::scoring::ScoringConfig;
use gd_core::session::{DEFAULT_LIVENESS_WINDOW_MINS, DEFAULT_PHASE_RETENTION_MINS};

pub mod coordinator;
pub mod qr_service;
pub mod qualification_service;
pub mod scoring_service;
pub mod survey_engine;
pub mod sweeper;

pub use coordinator::SessionCoordinator;
pub use qr_service::QrTokenService;
pub use qualification_service::QualificationService;
pub use scoring_service::ScoringService;
pub use survey_engine::SurveyEngine;

/// Grace period after a session's end time before the sweeper finalizes it.
pub const DEFAULT_COMPLETION_GRACE_MINS: i64 = 15;

/// Errors raised by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Runtime tunables shared by the services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub liveness_window_mins: i64,
    pub phase_retention_mins: i64,
    pub completion_grace_mins: i64,
    pub scoring: ScoringConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            liveness_window_mins: DEFAULT_LIVENESS_WINDOW_MINS,
            phase_retention_mins: DEFAULT_PHASE_RETENTION_MINS,
            completion_grace_mins: DEFAULT_COMPLETION_GRACE_MINS,
            scoring: ScoringConfig::default(),
        }
    }
}
