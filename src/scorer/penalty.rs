use super::metrics::BalanceMetrics;
use crate::assignment::Assignment;
use crate::config::PenaltyWeights;
use crate::model::{Roster, Student, StudentId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDetails {
    // Raw spreads
    pub population_delta: usize,
    pub gender_delta: usize,
    pub language_delta: usize,

    // Weighted excess beyond tolerance
    pub population_penalty: u32,
    pub gender_penalty: u32,
    pub language_penalty: u32,

    // Co-located trait pairs
    pub trait_incidents: usize,
    pub trait_penalty: u32,

    // Relationships
    pub broken_friendships: usize,
    pub broken_penalty: u32,
    pub hard_conflicts: usize, // reported, never weighted

    pub total: u32,
}

#[inline(always)]
pub fn excess(delta: usize, tolerance: u32, weight: u32) -> u32 {
    (delta as u32).saturating_sub(tolerance) * weight
}

/// Weight of two trait-bearing students sharing a section; 0 when the pair
/// carries no traits worth penalising.
pub fn trait_pair_weight(w: &PenaltyWeights, a: &Student, b: &Student) -> u32 {
    if a.special_needs && b.special_needs {
        w.conflict_both_special
    } else if (a.special_needs && b.lively) || (a.lively && b.special_needs) {
        w.conflict_special_lively
    } else if a.lively && b.lively {
        w.conflict_both_lively
    } else {
        0
    }
}

/// Trait pair incidents inside each section: (count, weighted sum).
pub fn trait_conflicts(
    roster: &Roster,
    assignment: &Assignment,
    w: &PenaltyWeights,
) -> (usize, u32) {
    let mut count = 0;
    let mut sum = 0;
    for sec in 0..assignment.section_count() {
        let bearers: Vec<&Student> = assignment
            .members(sec)
            .into_iter()
            .map(|id| roster.student(id))
            .filter(|s| s.has_trait())
            .collect();
        for (i, a) in bearers.iter().enumerate() {
            for b in &bearers[i + 1..] {
                let pw = trait_pair_weight(w, a, b);
                if pw > 0 {
                    count += 1;
                    sum += pw;
                }
            }
        }
    }
    (count, sum)
}

/// Mutual pairs placed apart. Pairs with an unplaced member only count when
/// `count_unplaced` is set.
pub fn broken_friendships(roster: &Roster, assignment: &Assignment, count_unplaced: bool) -> usize {
    roster
        .mutual_pairs()
        .into_iter()
        .filter(|&(a, b)| is_broken(assignment, a, b, count_unplaced))
        .count()
}

#[inline(always)]
pub fn is_broken(
    assignment: &Assignment,
    a: StudentId,
    b: StudentId,
    count_unplaced: bool,
) -> bool {
    match (assignment.section_of(a), assignment.section_of(b)) {
        (Some(x), Some(y)) => x != y,
        (None, None) => false,
        _ => count_unplaced,
    }
}

/// Declared conflicts sharing a section.
pub fn hard_conflicts(roster: &Roster, assignment: &Assignment) -> usize {
    (0..assignment.section_count())
        .map(|sec| roster.conflict_pairs_within(&assignment.members(sec)).len())
        .sum()
}

pub fn score(
    roster: &Roster,
    assignment: &Assignment,
    metrics: &BalanceMetrics,
    w: &PenaltyWeights,
) -> ScoreDetails {
    let d = &metrics.deltas;
    let population_penalty = excess(d.population, w.population_tolerance, w.population_weight);
    let gender_penalty = excess(d.gender, w.gender_tolerance, w.gender_weight);
    let language_penalty = excess(d.language, w.language_tolerance, w.language_weight);

    let (trait_incidents, trait_penalty) = trait_conflicts(roster, assignment, w);
    let broken = broken_friendships(roster, assignment, w.count_unplaced_as_broken);
    let broken_penalty = broken as u32 * w.broken_friendship;

    ScoreDetails {
        population_delta: d.population,
        gender_delta: d.gender,
        language_delta: d.language,
        population_penalty,
        gender_penalty,
        language_penalty,
        trait_incidents,
        trait_penalty,
        broken_friendships: broken,
        broken_penalty,
        hard_conflicts: hard_conflicts(roster, assignment),
        total: population_penalty
            + gender_penalty
            + language_penalty
            + trait_penalty
            + broken_penalty,
    }
}
