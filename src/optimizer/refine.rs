use super::units::{self, Objective, Swap, UnitIndex};
use crate::assignment::{Assignment, Scenario, SectionId};
use crate::config::{Config, Tolerances};
use crate::model::StudentId;
use crate::scorer::{BalanceDeltas, Scorer};
use crate::solver::{TierContext, TierOutcome};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use strum_macros::Display;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    WithinTargets,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub round: usize,
    pub objective: Objective,
    pub from: SectionId,
    pub to: SectionId,
    pub outgoing: Vec<StudentId>,
    pub incoming: Vec<StudentId>,
    pub penalty_before: u32,
    pub penalty_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineReport {
    pub status: RefineStatus,
    pub rounds: usize,
    // Starting penalty, then the penalty after every accepted swap
    pub penalty_trace: Vec<u32>,
    pub swaps: Vec<SwapRecord>,
    pub final_deltas: BalanceDeltas,
}

/// A candidate after simulation, ready for ranking.
struct Evaluated {
    swap: Swap,
    next: Assignment,
    penalty: u32,
    key: (Reverse<i64>, Reverse<i64>, Reverse<i64>, usize),
}

pub struct Refiner<'a> {
    scorer: &'a Scorer,
    tol: &'a Tolerances,
    capacity: usize,
    max_rounds: usize,
    top_k: usize,
}

impl<'a> Refiner<'a> {
    pub fn new(scorer: &'a Scorer, config: &'a Config) -> Self {
        Self {
            scorer,
            tol: &config.tolerances,
            capacity: config.sections.capacity,
            max_rounds: config.search.refine_max_rounds,
            top_k: config.search.refine_top_k,
        }
    }

    pub fn within_targets(&self, d: &BalanceDeltas) -> bool {
        d.population <= self.tol.target_population_spread
            && d.gender <= self.tol.target_gender_spread
            && d.language <= self.tol.target_language_spread
    }

    /// Language alone when only language is off, gender alone when only
    /// gender is off, otherwise both. Within targets still tries both.
    pub fn choose_objective(&self, d: &BalanceDeltas) -> Objective {
        if self.within_targets(d) {
            return Objective::Both;
        }
        let gender_ok = d.gender <= self.tol.target_gender_spread;
        let lang_ok = d.language <= self.tol.target_language_spread;
        match (gender_ok, lang_ok) {
            (true, false) => Objective::Language,
            (false, true) => Objective::Gender,
            _ => Objective::Both,
        }
    }

    fn evaluate(
        &self,
        scenario: &Scenario,
        base: &BalanceDeltas,
        base_pen: u32,
        objective: Objective,
        swap: Swap,
    ) -> Option<Evaluated> {
        let mut next = scenario.assignment.clone();
        swap.apply(&mut next);

        if next.populations().iter().any(|&p| p > self.capacity) {
            return None;
        }
        if !scenario.groups.iter().all(|g| next.keeps_together(g)) {
            return None;
        }

        let d = self.scorer.metrics(&next).deltas;
        let pop_target = self.tol.target_population_spread;
        if d.population > pop_target {
            return None;
        }
        if base.population <= pop_target && d.population > base.population {
            return None;
        }

        let lang_gain = base.language as i64 - d.language as i64;
        let gender_gain = base.gender as i64 - d.gender as i64;
        let rejected = match objective {
            Objective::Language => gender_gain < 0,
            Objective::Gender => lang_gain < 0,
            Objective::Both => lang_gain < 0 || gender_gain < 0,
        };
        if rejected {
            return None;
        }

        let penalty = self.scorer.total(&next);
        let pen_gain = base_pen as i64 - penalty as i64;
        let (primary, secondary) = match objective {
            Objective::Language => (lang_gain, gender_gain),
            Objective::Gender | Objective::Both => (gender_gain, lang_gain),
        };
        Some(Evaluated {
            key: (Reverse(primary), Reverse(secondary), Reverse(pen_gain), swap.moved()),
            swap,
            next,
            penalty,
        })
    }

    /// Runs swap rounds until nothing improves or the round cap is hit.
    pub fn refine(&self, scenario: &Scenario) -> Scenario {
        let mut current = scenario.clone();
        let mut trace = vec![current.total()];
        let mut swaps = Vec::new();
        let mut rounds = 0;

        while rounds < self.max_rounds {
            rounds += 1;
            let metrics = self.scorer.metrics(&current.assignment);
            let base = metrics.deltas;
            let base_pen = current.total();
            let objective = self.choose_objective(&base);

            let index = UnitIndex::build(&current);
            let mut ranked: Vec<Evaluated> =
                units::candidates(objective, &self.scorer.roster, &index, &metrics, self.top_k)
                    .into_iter()
                    .filter_map(|s| self.evaluate(&current, &base, base_pen, objective, s))
                    .collect();
            ranked.sort_by(|a, b| a.key.cmp(&b.key));
            debug!("Round {}: {} candidate swaps for {}", rounds, ranked.len(), objective);

            let Some(best) = ranked.into_iter().find(|e| e.penalty < base_pen) else {
                break;
            };

            swaps.push(SwapRecord {
                round: rounds,
                objective,
                from: best.swap.from,
                to: best.swap.to,
                outgoing: best.swap.outgoing.clone(),
                incoming: best.swap.incoming.clone(),
                penalty_before: base_pen,
                penalty_after: best.penalty,
            });
            trace.push(best.penalty);
            current.details = self.scorer.score(&best.next);
            current.assignment = best.next;
        }

        let final_deltas = self.scorer.metrics(&current.assignment).deltas;
        let status = if self.within_targets(&final_deltas) {
            RefineStatus::WithinTargets
        } else {
            warn!(
                "Refinement ended outside targets (pop {}, gender {}, language {})",
                final_deltas.population, final_deltas.gender, final_deltas.language
            );
            RefineStatus::Infeasible
        };

        info!(
            "Refine: {} swaps over {} rounds, penalty {} -> {}",
            swaps.len(),
            rounds,
            trace[0],
            current.total()
        );
        current.refinement = Some(RefineReport {
            status,
            rounds,
            penalty_trace: trace,
            swaps,
            final_deltas,
        });
        current
    }
}

pub fn solve(ctx: &TierContext, scenario: &Scenario) -> TierOutcome {
    let refined = Refiner::new(ctx.scorer, ctx.config).refine(scenario);
    TierOutcome::Placed(vec![refined])
}
