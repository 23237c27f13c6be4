//! Penalty reasons and the cap/disqualification policy.
//!
//! Every timeout is recorded with its nominal points. The score effect is
//! capped at `max_penalty`; a recorded total strictly above the cap
//! disqualifies the student. The two rules are independent.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::timer::TimerScope;

/// Default cap on penalty points deducted from a score.
pub const DEFAULT_MAX_PENALTY: i32 = 3;

/// Points recorded for one timeout.
pub const TIMEOUT_PENALTY_POINTS: i32 = 1;

/// Scope recorded on penalties that are not tied to a timer.
pub const SESSION_SCOPE: &str = "session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyReason {
    PerQuestionTimeout,
    OverallSurveyTimeout,
    ExcessiveRankDeviation,
}

impl PenaltyReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerQuestionTimeout => "per_question_timeout",
            Self::OverallSurveyTimeout => "overall_survey_timeout",
            Self::ExcessiveRankDeviation => "excessive_rank_deviation",
        }
    }

    pub fn for_scope(scope: TimerScope) -> Self {
        match scope {
            TimerScope::Question(_) => Self::PerQuestionTimeout,
            TimerScope::Overall => Self::OverallSurveyTimeout,
        }
    }
}

impl fmt::Display for PenaltyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PenaltyReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_question_timeout" => Ok(Self::PerQuestionTimeout),
            "overall_survey_timeout" => Ok(Self::OverallSurveyTimeout),
            "excessive_rank_deviation" => Ok(Self::ExcessiveRankDeviation),
            other => Err(CoreError::Validation(format!(
                "Invalid penalty reason '{other}'"
            ))),
        }
    }
}

/// A student's penalty standing after a timeout was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PenaltyOutcome {
    /// `false` when this scope had already been penalised.
    pub recorded: bool,
    /// Sum of all recorded penalty points.
    pub total_points: i32,
    /// Points that actually reduce the score.
    pub applied_points: i32,
    /// Whether the student is flagged for disqualification.
    pub disqualified: bool,
}

/// Points deducted from the score for a recorded total.
pub fn applied_points(total_points: i32, max_penalty: i32) -> i32 {
    total_points.clamp(0, max_penalty.max(0))
}

/// Whether a recorded total disqualifies the student.
pub fn exceeds_cap(total_points: i32, max_penalty: i32) -> bool {
    total_points > max_penalty
}

pub fn outcome(recorded: bool, total_points: i32, max_penalty: i32) -> PenaltyOutcome {
    PenaltyOutcome {
        recorded,
        total_points,
        applied_points: applied_points(total_points, max_penalty),
        disqualified: exceeds_cap(total_points, max_penalty),
    }
}
