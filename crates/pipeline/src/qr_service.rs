//! QR presence tokens: issue, validate, admit, deactivate.
//!
//! A token is a shared credential that admits at most `max_capacity`
//! scanners. Validation never consumes a seat; admission is a conditional
//! increment in the database, so concurrent scanners cannot oversubscribe.

use gd_core::clock::new_group_id;
use gd_core::error::CoreError;
use gd_core::qr::{self, QrPayload, DEFAULT_VALIDITY_MINS};
use gd_core::types::{DbId, Timestamp};
use gd_db::models::qr_token::{CreateQrToken, QrToken};
use gd_db::repositories::{QrTokenRepo, VenueRepo};
use gd_db::DbPool;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::PipelineResult;

/// A payload that matched a usable token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedToken {
    pub token_id: DbId,
    pub venue_id: DbId,
    pub group_id: Uuid,
}

impl From<&QrToken> for ValidatedToken {
    fn from(token: &QrToken) -> Self {
        Self {
            token_id: token.id,
            venue_id: token.venue_id,
            group_id: token.qr_group_id,
        }
    }
}

pub struct QrTokenService;

impl QrTokenService {
    /// Issue a fresh token for an active venue.
    ///
    /// `validity_mins` defaults to 15, `max_capacity` to the venue capacity.
    pub async fn issue(
        pool: &DbPool,
        venue_id: DbId,
        validity_mins: Option<i64>,
        max_capacity: Option<i32>,
        issuer_id: DbId,
        now: Timestamp,
    ) -> PipelineResult<QrToken> {
        let venue = VenueRepo::find_by_id(pool, venue_id)
            .await?
            .filter(|v| v.is_active)
            .ok_or(CoreError::NotFound {
                entity: "Venue",
                id: venue_id,
            })?;

        let validity_mins = validity_mins.unwrap_or(DEFAULT_VALIDITY_MINS);
        let max_capacity = max_capacity.unwrap_or(venue.capacity);
        qr::validate_issue(validity_mins, max_capacity)?;

        let payload = QrPayload::issue(venue.id, now, validity_mins);
        let token = QrTokenRepo::create(
            pool,
            &CreateQrToken {
                venue_id: venue.id,
                payload: payload.encode()?,
                expires_at: payload.expires_at()?,
                max_capacity,
                qr_group_id: new_group_id(),
                issued_by: issuer_id,
            },
        )
        .await?;

        tracing::info!(
            token_id = token.id,
            venue_id = venue.id,
            max_capacity,
            validity_mins,
            issuer_id,
            "QR token issued"
        );
        Ok(token)
    }

    /// Resolve a scanned payload to a usable token without consuming a seat.
    pub async fn validate(
        db: impl PgExecutor<'_>,
        raw: &str,
        now: Timestamp,
    ) -> PipelineResult<ValidatedToken> {
        let token = Self::find_scannable(db, raw, now).await?;
        qr::ensure_usable(
            token.is_active,
            token.expires_at,
            token.current_usage,
            token.max_capacity,
            now,
        )?;
        Ok(ValidatedToken::from(&token))
    }

    /// Like [`validate`](Self::validate) but without the seat check, for
    /// joins where a participant re-scanning must not need a free seat.
    /// New participants get their seat through [`admit`](Self::admit).
    pub async fn resolve(
        db: impl PgExecutor<'_>,
        raw: &str,
        now: Timestamp,
    ) -> PipelineResult<ValidatedToken> {
        let token = Self::find_scannable(db, raw, now).await?;
        Ok(ValidatedToken::from(&token))
    }

    async fn find_scannable(
        db: impl PgExecutor<'_>,
        raw: &str,
        now: Timestamp,
    ) -> PipelineResult<QrToken> {
        QrPayload::parse(raw)?;

        let token = QrTokenRepo::find_by_payload(db, raw)
            .await?
            .ok_or_else(|| CoreError::Missing("QR code not recognised".to_string()))?;
        qr::ensure_scannable(token.is_active, token.expires_at, now)?;
        Ok(token)
    }

    /// Consume one seat of a token.
    pub async fn admit(db: impl PgExecutor<'_>, token_id: DbId) -> PipelineResult<()> {
        if QrTokenRepo::try_admit(db, token_id).await? {
            Ok(())
        } else {
            Err(CoreError::CapacityExhausted(
                "QR code has reached its maximum number of scans".to_string(),
            )
            .into())
        }
    }

    /// Deactivate a token. Only its issuer may do so.
    pub async fn deactivate(pool: &DbPool, token_id: DbId, issuer_id: DbId) -> PipelineResult<()> {
        let token = QrTokenRepo::find_by_id(pool, token_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "QrToken",
                id: token_id,
            })?;

        if token.issued_by != issuer_id {
            return Err(CoreError::Forbidden(
                "Only the issuing admin can deactivate this QR code".to_string(),
            )
            .into());
        }

        QrTokenRepo::deactivate(pool, token_id).await?;
        tracing::info!(token_id, issuer_id, "QR token deactivated");
        Ok(())
    }

    /// Active, unexpired tokens for a venue issued by the caller, newest first.
    pub async fn list_active(
        pool: &DbPool,
        venue_id: DbId,
        issuer_id: DbId,
        now: Timestamp,
    ) -> PipelineResult<Vec<QrToken>> {
        Ok(QrTokenRepo::list_active(pool, venue_id, issuer_id, now).await?)
    }
}
