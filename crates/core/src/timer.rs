//! Survey timers. Expiry is a pure function of the start instant, the
//! session agenda and `now`; only starting a timer touches storage.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;
use crate::session::Agenda;
use crate::types::Timestamp;

const MS_PER_MINUTE: i64 = 60_000;

/// What a timer measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerScope {
    /// Time spent on one question (1-based question number).
    Question(u32),
    /// Time spent on the whole survey.
    Overall,
}

impl TimerScope {
    /// Time limit in milliseconds for this scope.
    ///
    /// The per-question limit splits the discussion time evenly across the
    /// session's questions; the overall limit is the survey time.
    pub fn limit_ms(self, agenda: &Agenda, question_count: usize) -> i64 {
        match self {
            Self::Question(_) => {
                let count = question_count.max(1) as i64;
                i64::from(agenda.discussion_minutes.max(0)) * MS_PER_MINUTE / count
            }
            Self::Overall => i64::from(agenda.survey_minutes.max(0)) * MS_PER_MINUTE,
        }
    }

    /// Reject question scopes that do not exist in the session.
    pub fn validate(self, question_count: usize) -> Result<(), CoreError> {
        match self {
            Self::Question(k) if k == 0 || k as usize > question_count => Err(
                CoreError::Validation(format!("Unknown question number {k}")),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TimerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Question(k) => write!(f, "question:{k}"),
            Self::Overall => f.write_str("overall"),
        }
    }
}

impl FromStr for TimerScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "overall" {
            return Ok(Self::Overall);
        }
        s.strip_prefix("question:")
            .and_then(|k| k.parse::<u32>().ok())
            .map(Self::Question)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid timer scope '{s}'. Expected 'overall' or 'question:<n>'"
                ))
            })
    }
}

/// Result of polling a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutStatus {
    pub started: bool,
    pub expired: bool,
    pub remaining_ms: i64,
    pub limit_ms: i64,
}

/// Evaluate a timer at `now`. An unstarted timer never expires.
pub fn timeout_status(started_at: Option<Timestamp>, limit_ms: i64, now: Timestamp) -> TimeoutStatus {
    match started_at {
        None => TimeoutStatus {
            started: false,
            expired: false,
            remaining_ms: limit_ms,
            limit_ms,
        },
        Some(start) => {
            let elapsed = (now - start).num_milliseconds().max(0);
            TimeoutStatus {
                started: true,
                expired: elapsed >= limit_ms,
                remaining_ms: (limit_ms - elapsed).max(0),
                limit_ms,
            }
        }
    }
}
