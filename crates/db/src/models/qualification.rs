//! Qualification model.

use gd_core::qualification::QualificationFact;
use gd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `qualifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Qualification {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub final_score: f64,
    pub qualified_for_level: i32,
    pub is_approved: bool,
    pub approved_by: Option<DbId>,
    pub feedback: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Qualification {
    pub fn fact(&self) -> QualificationFact {
        QualificationFact {
            id: self.id,
            qualified_for_level: self.qualified_for_level,
            is_approved: self.is_approved,
            created_at: self.created_at,
        }
    }
}

/// Request body for the approve endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApproveQualification {
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}
