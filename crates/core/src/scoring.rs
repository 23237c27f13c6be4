//! Peer-ranking scoring engine.
//!
//! Pure function of its inputs: the roster, the stored votes, the penalty
//! events and the level's ranking points. All accumulation happens over
//! id-ordered maps after sorting the votes, so identical inputs always give
//! an identical ordering regardless of the order rows were loaded in.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::CoreError;
use crate::penalty::{applied_points, exceeds_cap, DEFAULT_MAX_PENALTY};
use crate::survey::{effective_weight, RankingPoints};
use crate::types::DbId;

/// Default deviation above which a responder's score for a peer is suspect.
pub const DEFAULT_BIAS_THRESHOLD: f64 = 2.5;

/// Default number of suspect peers that marks a responder as biased.
pub const DEFAULT_BIAS_DETECTION_LIMIT: usize = 2;

/// Tunables of the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub bias_threshold: f64,
    pub bias_detection_limit: usize,
    pub max_penalty: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bias_threshold: DEFAULT_BIAS_THRESHOLD,
            bias_detection_limit: DEFAULT_BIAS_DETECTION_LIMIT,
            max_penalty: DEFAULT_MAX_PENALTY,
        }
    }
}

/// One stored survey result row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub responder_id: DbId,
    pub question_number: i32,
    pub ranked_student_id: DbId,
    pub rank: i32,
    pub weight: f64,
}

/// One stored penalty event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyRecord {
    pub student_id: DbId,
    pub points: i32,
}

/// A ranked, qualifying participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    /// 1-based position in the final ordering.
    pub position: usize,
    pub student_id: DbId,
    pub raw: f64,
    /// Penalty points deducted (capped).
    pub penalty: i32,
    pub final_score: f64,
    pub first_place_votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisqualificationReason {
    ExcessivePenalties,
    Biased,
}

/// A participant removed from the ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disqualified {
    pub student_id: DbId,
    pub raw: f64,
    /// Sum of all recorded penalty points (uncapped).
    pub recorded_penalty: i32,
    pub reasons: Vec<DisqualificationReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringOutcome {
    pub ranking: Vec<ScoreRow>,
    pub disqualified: Vec<Disqualified>,
    /// Every responder flagged as biased, participant or not.
    pub biased_responders: Vec<DbId>,
}

/// Score a session.
///
/// Votes for students outside `roster` are dropped without crediting anyone.
pub fn score_session(
    roster: &[DbId],
    votes: &[Vote],
    penalties: &[PenaltyRecord],
    points: &RankingPoints,
    config: &ScoringConfig,
) -> Result<ScoringOutcome, CoreError> {
    let roster: BTreeSet<DbId> = roster.iter().copied().collect();

    let mut kept: Vec<Vote> = votes
        .iter()
        .filter(|v| roster.contains(&v.ranked_student_id))
        .copied()
        .collect();
    kept.sort_by_key(|v| (v.ranked_student_id, v.responder_id, v.question_number, v.rank));

    // 1. Base scores.
    let mut raw: BTreeMap<DbId, f64> = roster.iter().map(|&p| (p, 0.0)).collect();
    let mut first_place: BTreeMap<DbId, i64> = roster.iter().map(|&p| (p, 0)).collect();
    let mut by_responder: BTreeMap<DbId, BTreeMap<DbId, f64>> = BTreeMap::new();

    for vote in &kept {
        let base = points.for_rank(vote.rank).map_err(|_| {
            CoreError::Internal(format!(
                "Stored survey result has invalid rank {}",
                vote.rank
            ))
        })?;
        let score = f64::from(base) * effective_weight(vote.weight);

        *raw.entry(vote.ranked_student_id).or_default() += score;
        *by_responder
            .entry(vote.responder_id)
            .or_default()
            .entry(vote.ranked_student_id)
            .or_default() += score;
        if vote.rank == 1 {
            *first_place.entry(vote.ranked_student_id).or_default() += 1;
        }
    }

    // 2. Penalties.
    let mut recorded_penalty: BTreeMap<DbId, i32> = BTreeMap::new();
    for p in penalties {
        *recorded_penalty.entry(p.student_id).or_default() += p.points;
    }

    // 3. Bias.
    let biased = detect_bias(&roster, &raw, &by_responder, config);

    // 4-6. Disqualification, final score, ordering.
    let mut ranking = Vec::new();
    let mut disqualified = Vec::new();

    for &student_id in &roster {
        let student_raw = raw.get(&student_id).copied().unwrap_or(0.0);
        let recorded = recorded_penalty.get(&student_id).copied().unwrap_or(0);

        let mut reasons = Vec::new();
        if exceeds_cap(recorded, config.max_penalty) {
            reasons.push(DisqualificationReason::ExcessivePenalties);
        }
        if biased.contains(&student_id) {
            reasons.push(DisqualificationReason::Biased);
        }

        if reasons.is_empty() {
            let penalty = applied_points(recorded, config.max_penalty);
            ranking.push(ScoreRow {
                position: 0,
                student_id,
                raw: student_raw,
                penalty,
                final_score: student_raw - f64::from(penalty),
                first_place_votes: first_place.get(&student_id).copied().unwrap_or(0),
            });
        } else {
            disqualified.push(Disqualified {
                student_id,
                raw: student_raw,
                recorded_penalty: recorded,
                reasons,
            });
        }
    }

    ranking.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| b.first_place_votes.cmp(&a.first_place_votes))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    for (i, row) in ranking.iter_mut().enumerate() {
        row.position = i + 1;
    }

    Ok(ScoringOutcome {
        ranking,
        disqualified,
        biased_responders: biased.into_iter().collect(),
    })
}

/// Flag responders whose scores deviate from the cohort mean for too many peers.
///
/// The cohort mean for `p` is `raw(p)` divided by the number of responders
/// other than `p`. Deviation must be strictly greater than the threshold.
fn detect_bias(
    roster: &BTreeSet<DbId>,
    raw: &BTreeMap<DbId, f64>,
    by_responder: &BTreeMap<DbId, BTreeMap<DbId, f64>>,
    config: &ScoringConfig,
) -> BTreeSet<DbId> {
    let responders: BTreeSet<DbId> = by_responder.keys().copied().collect();
    let mut biased = BTreeSet::new();

    for (&q, given) in by_responder {
        let mut suspect = 0usize;
        for &p in roster {
            if p == q {
                continue;
            }
            let others = responders.len() - usize::from(responders.contains(&p));
            if others == 0 {
                continue;
            }
            let mean = raw.get(&p).copied().unwrap_or(0.0) / others as f64;
            let own = given.get(&p).copied().unwrap_or(0.0);
            if (own - mean).abs() > config.bias_threshold {
                suspect += 1;
            }
        }
        if suspect >= config.bias_detection_limit.max(1) {
            biased.insert(q);
        }
    }

    biased
}
