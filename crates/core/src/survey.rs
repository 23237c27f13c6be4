//! Peer-ranking survey rules: ranking points, question weights, the
//! per-student question order and response validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::types::DbId;

/// Ranks run 1..=MAX_RANK.
pub const MAX_RANK: i32 = 3;

/// Upper bound of a question weight.
pub const MAX_QUESTION_WEIGHT: f64 = 2.0;

/// Questions served when a level has no active questions configured.
pub const FALLBACK_QUESTIONS: &[&str] = &[
    "Who contributed the most relevant ideas to the discussion?",
    "Who communicated most clearly and concisely?",
    "Who listened and built on what others said?",
    "Who showed leadership in steering the discussion?",
    "Who backed their arguments with the strongest reasoning?",
];

/// Weight of every fallback question.
pub const FALLBACK_WEIGHT: f64 = 1.0;

/// Submitted survey answers: question number -> rank -> ranked student.
pub type SurveyResponses = BTreeMap<u32, BTreeMap<i32, DbId>>;

/// Points awarded per rank for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingPoints {
    pub first_pts: i32,
    pub second_pts: i32,
    pub third_pts: i32,
}

impl Default for RankingPoints {
    fn default() -> Self {
        Self {
            first_pts: 4,
            second_pts: 3,
            third_pts: 2,
        }
    }
}

impl RankingPoints {
    /// Enforce `first > second > third > 0`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_pts > self.second_pts
            && self.second_pts > self.third_pts
            && self.third_pts > 0
        {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Ranking points must satisfy first > second > third > 0 (got {}, {}, {})",
                self.first_pts, self.second_pts, self.third_pts
            )))
        }
    }

    pub fn for_rank(&self, rank: i32) -> Result<i32, CoreError> {
        match rank {
            1 => Ok(self.first_pts),
            2 => Ok(self.second_pts),
            3 => Ok(self.third_pts),
            other => Err(CoreError::Validation(format!(
                "Invalid rank {other}. Must be between 1 and {MAX_RANK}"
            ))),
        }
    }
}

pub fn validate_weight(weight: f64) -> Result<(), CoreError> {
    if weight.is_finite() && (0.0..=MAX_QUESTION_WEIGHT).contains(&weight) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Question weight must be between 0 and {MAX_QUESTION_WEIGHT}"
        )))
    }
}

/// Weight used for scoring. Non-positive and non-finite weights count as 0.
pub fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// A question as served to a student, with its canonical number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberedQuestion {
    /// 1-based position in the level's display order. Submissions use this.
    pub question_number: u32,
    /// `None` for the built-in fallback set.
    pub question_id: Option<DbId>,
    pub text: String,
    pub weight: f64,
}

/// The built-in question set, numbered 1..n.
pub fn fallback_questions() -> Vec<NumberedQuestion> {
    FALLBACK_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, text)| NumberedQuestion {
            question_number: i as u32 + 1,
            question_id: None,
            text: (*text).to_string(),
            weight: FALLBACK_WEIGHT,
        })
        .collect()
}

/// Deterministic permutation of `0..n` keyed by `(student_id, session_id)`.
///
/// Fisher-Yates driven by SHA-256 of `"<student>:<session>:<step>"`. The
/// same student sees the same order on every reload of the same session.
pub fn question_order(student_id: DbId, session_id: DbId, n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = (keyed_u64(student_id, session_id, i as u64) % (i as u64 + 1)) as usize;
        order.swap(i, j);
    }
    order
}

/// Apply [`question_order`] to a numbered question list.
pub fn personalize(
    questions: Vec<NumberedQuestion>,
    student_id: DbId,
    session_id: DbId,
) -> Vec<NumberedQuestion> {
    let order = question_order(student_id, session_id, questions.len());
    let mut slots: Vec<Option<NumberedQuestion>> = questions.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
        .collect()
}

fn keyed_u64(student_id: DbId, session_id: DbId, step: u64) -> u64 {
    let digest = Sha256::digest(format!("{student_id}:{session_id}:{step}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Validate a survey submission before anything is written.
///
/// `participants` is the full roster of the session (dummy included).
pub fn validate_responses(
    responses: &SurveyResponses,
    responder_id: DbId,
    question_count: usize,
    participants: &BTreeSet<DbId>,
) -> Result<(), CoreError> {
    for (&question_number, ranks) in responses {
        if question_number == 0 || question_number as usize > question_count {
            return Err(CoreError::Validation(format!(
                "Unknown question number {question_number}"
            )));
        }

        let mut seen = BTreeSet::new();
        for (&rank, &student_id) in ranks {
            if !(1..=MAX_RANK).contains(&rank) {
                return Err(CoreError::Validation(format!(
                    "Invalid rank {rank} for question {question_number}"
                )));
            }
            if student_id == responder_id {
                return Err(CoreError::Validation(
                    "You cannot rank yourself".to_string(),
                ));
            }
            if !seen.insert(student_id) {
                return Err(CoreError::Validation(format!(
                    "Student {student_id} ranked more than once in question {question_number}"
                )));
            }
            if !participants.contains(&student_id) {
                return Err(CoreError::Validation(format!(
                    "Student {student_id} is not a participant of this session"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn roster() -> BTreeSet<DbId> {
        [1, 2, 3, 4].into_iter().collect()
    }

    fn answer(pairs: &[(u32, &[(i32, DbId)])]) -> SurveyResponses {
        pairs
            .iter()
            .map(|(q, ranks)| (*q, ranks.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn default_points_are_four_three_two() {
        let pts = RankingPoints::default();
        assert_eq!(pts.for_rank(1).unwrap(), 4);
        assert_eq!(pts.for_rank(2).unwrap(), 3);
        assert_eq!(pts.for_rank(3).unwrap(), 2);
        assert!(pts.for_rank(4).is_err());
    }

    #[test]
    fn points_must_strictly_descend() {
        assert!(RankingPoints::default().validate().is_ok());
        let flat = RankingPoints {
            first_pts: 3,
            second_pts: 3,
            third_pts: 1,
        };
        assert!(flat.validate().is_err());
        let zero = RankingPoints {
            first_pts: 2,
            second_pts: 1,
            third_pts: 0,
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn weight_range() {
        assert!(validate_weight(0.0).is_ok());
        assert!(validate_weight(2.0).is_ok());
        assert!(validate_weight(2.01).is_err());
        assert!(validate_weight(-0.5).is_err());
        assert!(validate_weight(f64::NAN).is_err());
    }

    #[test]
    fn negative_weight_scores_zero() {
        assert_eq!(effective_weight(-1.0), 0.0);
        assert_eq!(effective_weight(0.0), 0.0);
        assert_eq!(effective_weight(1.5), 1.5);
    }

    #[test]
    fn order_is_a_permutation() {
        let mut order = question_order(42, 7, 9);
        order.sort_unstable();
        assert_eq!(order, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn order_is_stable_across_calls() {
        assert_eq!(question_order(42, 7, 12), question_order(42, 7, 12));
    }

    #[test]
    fn order_differs_between_students() {
        let distinct = (1..20)
            .map(|student| question_order(student, 7, 8))
            .collect::<BTreeSet<_>>();
        assert!(distinct.len() > 1, "orders should vary between students");
    }

    #[test]
    fn trivial_orders() {
        assert!(question_order(1, 1, 0).is_empty());
        assert_eq!(question_order(1, 1, 1), vec![0]);
    }

    #[test]
    fn personalize_keeps_canonical_numbers() {
        let served = personalize(fallback_questions(), 5, 9);
        assert_eq!(served.len(), FALLBACK_QUESTIONS.len());
        let mut numbers: Vec<u32> = served.iter().map(|q| q.question_number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        for q in &served {
            assert_eq!(q.text, FALLBACK_QUESTIONS[q.question_number as usize - 1]);
        }
    }

    #[test]
    fn valid_submission_passes() {
        let r = answer(&[(1, &[(1, 2), (2, 3), (3, 4)]), (2, &[(1, 3)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_ok());
    }

    #[test]
    fn self_ranking_rejected() {
        let r = answer(&[(1, &[(1, 1)])]);
        assert_matches!(
            validate_responses(&r, 1, 2, &roster()),
            Err(CoreError::Validation(msg)) if msg.contains("yourself")
        );
    }

    #[test]
    fn duplicate_student_in_question_rejected() {
        let r = answer(&[(1, &[(1, 2), (2, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
    }

    #[test]
    fn same_student_across_questions_allowed() {
        let r = answer(&[(1, &[(1, 2)]), (2, &[(1, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_ok());
    }

    #[test]
    fn out_of_range_rank_rejected() {
        let r = answer(&[(1, &[(4, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
        let r = answer(&[(1, &[(0, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
    }

    #[test]
    fn unknown_question_rejected() {
        let r = answer(&[(3, &[(1, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
        let r = answer(&[(0, &[(1, 2)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
    }

    #[test]
    fn non_participant_rejected() {
        let r = answer(&[(1, &[(1, 99)])]);
        assert!(validate_responses(&r, 1, 2, &roster()).is_err());
    }
}
