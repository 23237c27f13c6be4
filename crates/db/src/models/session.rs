//! Session, participant and phase-tracking models.

use std::collections::BTreeMap;
use std::str::FromStr;

use gd_core::error::CoreError;
use gd_core::session::{Agenda, SessionStatus};
use gd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A row from the `gd_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GdSession {
    pub id: DbId,
    pub venue_id: DbId,
    pub level: i32,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub agenda: Json<Agenda>,
    /// Per-question weight overrides keyed by question id.
    pub survey_weights: Json<BTreeMap<String, f64>>,
    #[serde(skip_serializing)]
    pub qr_group_id: Option<Uuid>,
    pub topic: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GdSession {
    /// Parsed status. The column is CHECK-constrained, so failure means a
    /// schema/code mismatch.
    pub fn status(&self) -> Result<SessionStatus, CoreError> {
        SessionStatus::from_str(&self.status)
            .map_err(|_| CoreError::Internal(format!("Unknown session status '{}'", self.status)))
    }

    /// Weight override for a stored question, if the session defines one.
    pub fn weight_override(&self, question_id: DbId) -> Option<f64> {
        self.survey_weights.0.get(&question_id.to_string()).copied()
    }
}

/// Insert DTO for a session.
#[derive(Debug, Clone)]
pub struct CreateGdSession {
    pub venue_id: DbId,
    pub level: i32,
    pub status: SessionStatus,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub agenda: Agenda,
    pub survey_weights: BTreeMap<String, f64>,
    pub qr_group_id: Option<Uuid>,
    pub topic: Option<String>,
}

/// Request body for `POST /admin/sessions/bulk`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkCreateSessions {
    #[validate(length(min = 1))]
    pub venue_ids: Vec<DbId>,
    pub start_time: Timestamp,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i64,
    #[validate(length(max = 500))]
    pub topic: Option<String>,
    #[validate(nested)]
    pub agenda: Option<Agenda>,
    #[serde(default)]
    pub survey_weights: BTreeMap<String, f64>,
}

/// Open session summary shown to students choosing a slot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionListing {
    pub id: DbId,
    pub venue_id: DbId,
    pub venue_name: String,
    pub level: i32,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub topic: Option<String>,
    pub capacity: i32,
    pub booked: i64,
}

/// Session view for a participant.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionDetails {
    pub id: DbId,
    pub venue_id: DbId,
    pub venue_name: String,
    pub level: i32,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub topic: Option<String>,
    pub agenda: Json<Agenda>,
}

/// A row from the `session_participants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionParticipant {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub is_dummy: bool,
    pub joined_at: Timestamp,
}

/// A participant seen within the liveness window.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PresentParticipant {
    pub student_id: DbId,
    pub name: String,
    pub roll_number: String,
    pub phase: String,
    pub last_seen: Timestamp,
}

/// A row from the `phase_tracking` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhaseEntry {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub phase: String,
    pub started_at: Timestamp,
}
