//! Periodic pipeline maintenance.
//!
//! Every tick purges phase tracking rows past the retention window and
//! finalizes active sessions whose end time plus grace has passed. Both jobs
//! are idempotent, so a missed or repeated tick is harmless.

use std::sync::Arc;
use std::time::Duration;

use gd_core::clock::Clock;
use gd_db::DbPool;
use gd_pipeline::sweeper;
use gd_pipeline::PipelineSettings;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the sweeper loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
    interval_mins: u64,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(interval_mins * 60);
    tracing::info!(interval_mins, "Sweeper started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                match sweeper::sweep(&pool, clock.now(), &settings).await {
                    Ok(report) => {
                        if report.phases_purged > 0 || report.sessions_finalized > 0 {
                            tracing::info!(
                                phases_purged = report.phases_purged,
                                sessions_finalized = report.sessions_finalized,
                                "Sweeper: pass complete"
                            );
                        } else {
                            tracing::debug!("Sweeper: nothing to do");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Sweeper: pass failed");
                    }
                }
            }
        }
    }
}
