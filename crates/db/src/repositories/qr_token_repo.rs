//! Repository for the `qr_tokens` table.

use gd_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::qr_token::{CreateQrToken, QrToken};

const COLUMNS: &str = "id, venue_id, payload, expires_at, max_capacity, current_usage, \
                       is_active, qr_group_id, issued_by, created_at";

/// Provides persistence and the admission compare-and-set for QR tokens.
pub struct QrTokenRepo;

impl QrTokenRepo {
    pub async fn create(
        db: impl PgExecutor<'_>,
        input: &CreateQrToken,
    ) -> Result<QrToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO qr_tokens (venue_id, payload, expires_at, max_capacity, qr_group_id, issued_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QrToken>(&query)
            .bind(input.venue_id)
            .bind(&input.payload)
            .bind(input.expires_at)
            .bind(input.max_capacity)
            .bind(input.qr_group_id)
            .bind(input.issued_by)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<QrToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM qr_tokens WHERE id = $1");
        sqlx::query_as::<_, QrToken>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Exact-match lookup on the serialized payload string.
    pub async fn find_by_payload(
        db: impl PgExecutor<'_>,
        payload: &str,
    ) -> Result<Option<QrToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM qr_tokens WHERE payload = $1");
        sqlx::query_as::<_, QrToken>(&query)
            .bind(payload)
            .fetch_optional(db)
            .await
    }

    /// Consume one seat. Returns `false` when the token is already full.
    ///
    /// The guard in the WHERE clause makes concurrent admissions linearizable:
    /// at most `max_capacity` calls ever succeed.
    pub async fn try_admit(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE qr_tokens SET current_usage = current_usage + 1
             WHERE id = $1 AND current_usage < max_capacity",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a token inactive. Returns `true` if a row changed.
    pub async fn deactivate(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE qr_tokens SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active, unexpired tokens for a venue issued by `issuer_id`, newest first.
    pub async fn list_active(
        db: impl PgExecutor<'_>,
        venue_id: DbId,
        issuer_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<QrToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM qr_tokens
             WHERE venue_id = $1 AND issued_by = $2 AND is_active AND expires_at > $3
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, QrToken>(&query)
            .bind(venue_id)
            .bind(issuer_id)
            .bind(now)
            .fetch_all(db)
            .await
    }
}
