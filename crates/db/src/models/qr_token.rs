//! QR presence token model.

use gd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `qr_tokens` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QrToken {
    pub id: DbId,
    pub venue_id: DbId,
    pub payload: String,
    pub expires_at: Timestamp,
    pub max_capacity: i32,
    pub current_usage: i32,
    pub is_active: bool,
    /// Server-side only: binds every scan of this token to one session.
    #[serde(skip_serializing)]
    pub qr_group_id: Uuid,
    pub issued_by: DbId,
    pub created_at: Timestamp,
}

/// Insert DTO. Usage always starts at zero.
#[derive(Debug, Clone)]
pub struct CreateQrToken {
    pub venue_id: DbId,
    pub payload: String,
    pub expires_at: Timestamp,
    pub max_capacity: i32,
    pub qr_group_id: Uuid,
    pub issued_by: DbId,
}
