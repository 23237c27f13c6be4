//! Qualification drafting and the level-progression view.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::level::{next_level, MAX_LEVEL};
use crate::scoring::ScoringOutcome;
use crate::types::{DbId, Timestamp};

/// A qualification to upsert for one scored participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationDraft {
    pub student_id: DbId,
    pub final_score: f64,
    pub qualified_for_level: i32,
}

/// Draft one qualification per ranked (non-disqualified) participant.
///
/// `current_levels` maps student id to the student's current level; students
/// missing from it (deleted since the session) are skipped, as are students
/// already at [`MAX_LEVEL`] since there is no higher level to qualify for.
pub fn draft_qualifications(
    outcome: &ScoringOutcome,
    current_levels: &BTreeMap<DbId, i32>,
) -> Vec<QualificationDraft> {
    outcome
        .ranking
        .iter()
        .filter_map(|row| {
            current_levels
                .get(&row.student_id)
                .filter(|&&level| level < MAX_LEVEL)
                .map(|&level| QualificationDraft {
                    student_id: row.student_id,
                    final_score: row.final_score,
                    qualified_for_level: next_level(level),
                })
        })
        .collect()
}

/// Minimal qualification facts needed for the progression query.
#[derive(Debug, Clone, Copy)]
pub struct QualificationFact {
    pub id: DbId,
    pub qualified_for_level: i32,
    pub is_approved: bool,
    pub created_at: Timestamp,
}

/// Where a student stands on the level ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub current_level: i32,
    /// Highest level covered by an approved qualification.
    pub highest_approved_level: Option<i32>,
    /// Newest unapproved qualification created after the latest approval.
    pub pending_qualification_id: Option<DbId>,
    pub pending_level: Option<i32>,
}

pub fn level_progress(current_level: i32, facts: &[QualificationFact]) -> LevelProgress {
    let highest_approved_level = facts
        .iter()
        .filter(|f| f.is_approved)
        .map(|f| f.qualified_for_level)
        .max();

    let latest_approval = facts
        .iter()
        .filter(|f| f.is_approved)
        .map(|f| f.created_at)
        .max();

    let pending = facts
        .iter()
        .filter(|f| !f.is_approved)
        .filter(|f| latest_approval.map_or(true, |approved_at| f.created_at > approved_at))
        .max_by_key(|f| (f.created_at, f.id));

    LevelProgress {
        current_level,
        highest_approved_level,
        pending_qualification_id: pending.map(|f| f.id),
        pending_level: pending.map(|f| f.qualified_for_level),
    }
}
