//! Penalty event model.

use gd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `penalty_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PenaltyEvent {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub reason: String,
    pub scope: String,
    pub points: i32,
    pub created_at: Timestamp,
}

/// Insert DTO for a penalty event.
#[derive(Debug, Clone)]
pub struct NewPenalty {
    pub session_id: DbId,
    pub student_id: DbId,
    pub reason: String,
    pub scope: String,
    pub points: i32,
    pub created_at: Timestamp,
}
