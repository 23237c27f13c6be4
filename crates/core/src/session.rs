//! Session lifecycle: status state machine, agenda, phases and presence.
//!
//! ```text
//! pending ──► lobby ──► active ──► completed
//!    │          │         │
//!    └──────────┴─────────┴──────► cancelled
//! pending ─────────────► active            (first QR admit)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Sliding window within which a phase entry counts as "present".
pub const DEFAULT_LIVENESS_WINDOW_MINS: i64 = 5;

/// Phase entries older than this are garbage.
pub const DEFAULT_PHASE_RETENTION_MINS: i64 = 60;

/// Length of the pending session created by a booking.
pub const BOOKING_WINDOW_MINS: i64 = 60;

/// Upper bound on any single agenda phase.
pub const MAX_PHASE_MINUTES: i32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Lobby,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Lobby => "lobby",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from `self`. Terminal statuses return an empty slice.
    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        match self {
            Self::Pending => &[Self::Lobby, Self::Active, Self::Cancelled],
            Self::Lobby => &[Self::Active, Self::Cancelled],
            Self::Active => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: SessionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn validate_transition(self, to: SessionStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid session transition: {self} -> {to}"
            )))
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "lobby" => Ok(Self::Lobby),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Invalid session status '{other}'"
            ))),
        }
    }
}

/// Per-student progress marker inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prep,
    Discussion,
    Survey,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prep => "prep",
            Self::Discussion => "discussion",
            Self::Survey => "survey",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prep" => Ok(Self::Prep),
            "discussion" => Ok(Self::Discussion),
            "survey" => Ok(Self::Survey),
            other => Err(CoreError::Validation(format!("Invalid phase '{other}'"))),
        }
    }
}

/// Phase durations of a session, stored as JSON on the session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Agenda {
    #[validate(range(min = 0, max = 240))]
    pub prep_minutes: i32,
    #[validate(range(min = 0, max = 240))]
    pub discussion_minutes: i32,
    #[validate(range(min = 0, max = 240))]
    pub survey_minutes: i32,
}

impl Default for Agenda {
    fn default() -> Self {
        Self {
            prep_minutes: 5,
            discussion_minutes: 20,
            survey_minutes: 10,
        }
    }
}

impl Agenda {
    pub fn total_minutes(&self) -> i64 {
        i64::from(self.prep_minutes)
            + i64::from(self.discussion_minutes)
            + i64::from(self.survey_minutes)
    }

    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(format!("Invalid agenda: {e}")))
    }
}

/// Oldest `started_at` that still counts as present at `now`.
pub fn presence_cutoff(now: Timestamp, liveness_window_mins: i64) -> Timestamp {
    now - chrono::Duration::minutes(liveness_window_mins)
}

/// Whether a phase entry started at `started_at` makes its student present.
pub fn is_present(started_at: Timestamp, now: Timestamp, liveness_window_mins: i64) -> bool {
    started_at > presence_cutoff(now, liveness_window_mins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_go_active_directly() {
        assert!(SessionStatus::Pending.can_transition(SessionStatus::Active));
    }

    #[test]
    fn lobby_path() {
        assert!(SessionStatus::Pending.can_transition(SessionStatus::Lobby));
        assert!(SessionStatus::Lobby.can_transition(SessionStatus::Active));
    }

    #[test]
    fn active_completes() {
        assert!(SessionStatus::Active.can_transition(SessionStatus::Completed));
    }

    #[test]
    fn pending_cannot_complete() {
        assert!(!SessionStatus::Pending.can_transition(SessionStatus::Completed));
        assert!(!SessionStatus::Lobby.can_transition(SessionStatus::Completed));
    }

    #[test]
    fn non_terminal_states_cancel() {
        for s in [
            SessionStatus::Pending,
            SessionStatus::Lobby,
            SessionStatus::Active,
        ] {
            assert!(s.can_transition(SessionStatus::Cancelled), "{s} should cancel");
        }
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn invalid_transition_message_names_states() {
        let err = SessionStatus::Completed
            .validate_transition(SessionStatus::Active)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("active"));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            SessionStatus::Pending,
            SessionStatus::Lobby,
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<SessionStatus>().unwrap(), s);
        }
        assert!("archived".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn phase_parse() {
        assert_eq!("survey".parse::<Phase>().unwrap(), Phase::Survey);
        assert!("lunch".parse::<Phase>().is_err());
    }

    #[test]
    fn agenda_bounds() {
        assert!(Agenda::default().check().is_ok());
        let bad = Agenda {
            prep_minutes: -1,
            ..Agenda::default()
        };
        assert!(bad.check().is_err());
        let long = Agenda {
            survey_minutes: MAX_PHASE_MINUTES + 1,
            ..Agenda::default()
        };
        assert!(long.check().is_err());
    }

    #[test]
    fn agenda_total() {
        assert_eq!(Agenda::default().total_minutes(), 35);
    }

    #[test]
    fn presence_window_is_strict() {
        let now = chrono::Utc::now();
        assert!(is_present(now - chrono::Duration::minutes(4), now, 5));
        assert!(!is_present(now - chrono::Duration::minutes(5), now, 5));
        assert!(!is_present(now - chrono::Duration::minutes(6), now, 5));
    }
}
