//! Idempotent maintenance jobs run by the background sweeper.

use chrono::Duration;
use gd_core::types::Timestamp;
use gd_db::repositories::{GdSessionRepo, PhaseTrackingRepo};
use gd_db::DbPool;

use crate::scoring_service::{FinalizeOutcome, ScoringService};
use crate::{PipelineResult, PipelineSettings};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub phases_purged: u64,
    pub sessions_finalized: usize,
}

/// Delete phase-tracking entries older than the retention window.
pub async fn purge_stale_phases(
    pool: &DbPool,
    now: Timestamp,
    settings: &PipelineSettings,
) -> PipelineResult<u64> {
    let cutoff = now - Duration::minutes(settings.phase_retention_mins);
    Ok(PhaseTrackingRepo::purge_older_than(pool, cutoff).await?)
}

/// Finalize active sessions whose end time plus grace has passed.
///
/// A session that fails to finalize is logged and skipped so one bad
/// session does not block the rest.
pub async fn finalize_overdue_sessions(
    pool: &DbPool,
    now: Timestamp,
    settings: &PipelineSettings,
) -> PipelineResult<usize> {
    let cutoff = now - Duration::minutes(settings.completion_grace_mins);
    let overdue = GdSessionRepo::overdue_active(pool, cutoff).await?;

    let mut finalized = 0;
    for session_id in overdue {
        match ScoringService::finalize(pool, session_id, now, &settings.scoring).await {
            Ok(FinalizeOutcome::Finalized { .. }) => finalized += 1,
            Ok(FinalizeOutcome::AlreadyCompleted) => {}
            Err(e) => {
                tracing::error!(session_id, error = %e, "Failed to finalize overdue session");
            }
        }
    }
    Ok(finalized)
}

/// Run both jobs once.
pub async fn sweep(
    pool: &DbPool,
    now: Timestamp,
    settings: &PipelineSettings,
) -> PipelineResult<SweepReport> {
    let phases_purged = purge_stale_phases(pool, now, settings).await?;
    let sessions_finalized = finalize_overdue_sessions(pool, now, settings).await?;
    Ok(SweepReport {
        phases_purged,
        sessions_finalized,
    })
}
