//! Repository for the `ranking_points_config` table.

use gd_core::survey::RankingPoints;
use sqlx::PgExecutor;

use crate::models::survey::RankingPointsConfig;

const COLUMNS: &str = "id, level, first_pts, second_pts, third_pts, is_active, created_at, updated_at";

/// Per-level rank-to-points configuration.
pub struct RankingPointsRepo;

impl RankingPointsRepo {
    pub async fn list_active(
        db: impl PgExecutor<'_>,
    ) -> Result<Vec<RankingPointsConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ranking_points_config WHERE is_active ORDER BY level");
        sqlx::query_as::<_, RankingPointsConfig>(&query)
            .fetch_all(db)
            .await
    }

    pub async fn find_active(
        db: impl PgExecutor<'_>,
        level: i32,
    ) -> Result<Option<RankingPointsConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ranking_points_config WHERE level = $1 AND is_active"
        );
        sqlx::query_as::<_, RankingPointsConfig>(&query)
            .bind(level)
            .fetch_optional(db)
            .await
    }

    /// Points for `level`, falling back to the built-in default.
    pub async fn points_for_level(
        db: impl PgExecutor<'_>,
        level: i32,
    ) -> Result<RankingPoints, sqlx::Error> {
        Ok(Self::find_active(db, level)
            .await?
            .map(|config| config.points())
            .unwrap_or_default())
    }

    /// Replace the active configuration of a level.
    pub async fn upsert(
        db: impl PgExecutor<'_>,
        level: i32,
        points: &RankingPoints,
    ) -> Result<RankingPointsConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO ranking_points_config (level, first_pts, second_pts, third_pts)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (level) WHERE is_active DO UPDATE SET
                first_pts = EXCLUDED.first_pts,
                second_pts = EXCLUDED.second_pts,
                third_pts = EXCLUDED.third_pts,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RankingPointsConfig>(&query)
            .bind(level)
            .bind(points.first_pts)
            .bind(points.second_pts)
            .bind(points.third_pts)
            .fetch_one(db)
            .await
    }
}
