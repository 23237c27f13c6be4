//! Survey question, ranking-points, result, completion and timer models.

use gd_core::survey::RankingPoints;
use gd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `survey_questions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyQuestion {
    pub id: DbId,
    pub text: String,
    pub weight: f64,
    pub levels: Vec<i32>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a survey question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(range(min = 0.0, max = 2.0))]
    pub weight: f64,
    #[validate(length(min = 1, max = 3))]
    pub levels: Vec<i32>,
    #[serde(default)]
    pub display_order: i32,
}

/// DTO for updating a survey question. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub text: Option<String>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub weight: Option<f64>,
    #[validate(length(min = 1, max = 3))]
    pub levels: Option<Vec<i32>>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

/// A row from the `ranking_points_config` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RankingPointsConfig {
    pub id: DbId,
    pub level: i32,
    pub first_pts: i32,
    pub second_pts: i32,
    pub third_pts: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RankingPointsConfig {
    pub fn points(&self) -> RankingPoints {
        RankingPoints {
            first_pts: self.first_pts,
            second_pts: self.second_pts,
            third_pts: self.third_pts,
        }
    }
}

/// A row from the `survey_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyResult {
    pub id: DbId,
    pub session_id: DbId,
    pub responder_id: DbId,
    pub question_number: i32,
    pub question_id: Option<DbId>,
    pub ranked_student_id: DbId,
    pub rank: i32,
    pub weight: f64,
    pub score: f64,
    pub is_current_session: bool,
    pub is_completed: bool,
    pub created_at: Timestamp,
}

/// Insert DTO for one ranked answer.
#[derive(Debug, Clone)]
pub struct NewSurveyResult {
    pub session_id: DbId,
    pub responder_id: DbId,
    pub question_number: i32,
    pub question_id: Option<DbId>,
    pub ranked_student_id: DbId,
    pub rank: i32,
    pub weight: f64,
    pub score: f64,
    pub is_completed: bool,
    pub created_at: Timestamp,
}

/// The columns the scoring engine needs from a result row.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct VoteRow {
    pub responder_id: DbId,
    pub question_number: i32,
    pub ranked_student_id: DbId,
    pub rank: i32,
    pub weight: f64,
}

/// A row from the `survey_completions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyCompletion {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub completed_at: Timestamp,
}

/// A row from the `survey_timers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyTimer {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub scope: String,
    pub started_at: Timestamp,
}
