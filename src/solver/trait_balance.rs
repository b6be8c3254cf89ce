use super::{take_ranked, Tier, TierContext, TierOutcome};
use crate::assignment::{Assignment, Scenario, SectionId};
use crate::model::{Roster, StudentId};
use crate::scorer::metrics::{self, SectionTally};
use crate::scorer::penalty;
use std::cmp::Reverse;
use tracing::{debug, info, warn};

/// Allowed per-section count `[low, high]` for one trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRange {
    pub low: usize,
    pub high: usize,
}

impl TargetRange {
    pub fn for_total(total: usize, sections: usize) -> Self {
        let q = total / sections;
        let r = total % sections;
        Self {
            low: q,
            high: q + usize::from(r > 0),
        }
    }

    pub fn contains(&self, v: usize) -> bool {
        self.low <= v && v <= self.high
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    choice: Vec<SectionId>,
    incidents: usize,
    broken: usize,
    total: u32,
    preserved: usize,
}

struct Search<'a> {
    ctx: &'a TierContext<'a>,
    base: &'a Assignment,
    order: Vec<StudentId>,
    lively: TargetRange,
    special: TargetRange,

    tallies: Vec<SectionTally>,
    choice: Vec<SectionId>,
    found: Vec<Candidate>,
    nodes: usize,
    budget: usize,
}

impl<'a> Search<'a> {
    fn roster(&self) -> &'a Roster {
        &self.ctx.scorer.roster
    }

    fn blocked(&self, depth: usize, id: StudentId, sec: SectionId) -> bool {
        let t = &self.tallies[sec];
        let s = self.roster().student(id);
        if t.population + 1 > self.ctx.capacity() {
            return true;
        }
        if s.lively && t.lively + 1 > self.lively.high {
            return true;
        }
        if s.special_needs && t.special + 1 > self.special.high {
            return true;
        }

        let roster = self.roster();
        let with_fixed = roster
            .ids()
            .any(|o| self.base.section_of(o) == Some(sec) && roster.in_conflict(id, o));
        let with_new = (0..depth)
            .any(|j| self.choice[j] == sec && roster.in_conflict(id, self.order[j]));
        with_fixed || with_new
    }

    fn section_order(&self) -> Vec<SectionId> {
        let mut secs: Vec<SectionId> = (0..self.tallies.len()).collect();
        secs.sort_by_key(|&s| {
            let t = &self.tallies[s];
            (t.population, t.special, t.lively)
        });
        secs
    }

    fn dfs(&mut self, depth: usize) {
        self.nodes += 1;
        if self.nodes > self.budget {
            return;
        }
        if depth == self.order.len() {
            self.leaf();
            return;
        }

        let id = self.order[depth];
        for sec in self.section_order() {
            if self.blocked(depth, id, sec) {
                continue;
            }
            let student = self.roster().student(id);
            self.tallies[sec].add(student);
            self.choice.push(sec);
            self.dfs(depth + 1);
            self.choice.pop();
            self.tallies[sec].remove(student);

            if self.nodes > self.budget {
                return;
            }
        }
    }

    fn leaf(&mut self) {
        let sections = self.tallies.len();
        if self.order.len() >= 2 && sections > 1 {
            let first = self.choice[0];
            if self.choice.iter().all(|&s| s == first) {
                return;
            }
        }
        let in_range = self
            .tallies
            .iter()
            .all(|t| self.lively.contains(t.lively) && self.special.contains(t.special));
        if !in_range {
            return;
        }

        let mut next = self.base.clone();
        for (&id, &sec) in self.order.iter().zip(&self.choice) {
            next.place(id, sec, Some(Tier::TraitBalance));
        }
        let roster = self.roster();
        let w = &self.ctx.scorer.weights;
        let (incidents, _) = penalty::trait_conflicts(roster, &next, w);
        let broken = penalty::broken_friendships(roster, &next, false);
        let preserved = roster
            .mutual_pairs()
            .into_iter()
            .filter(|&(a, b)| {
                next.section_of(a).is_some() && next.section_of(a) == next.section_of(b)
            })
            .count();
        let total = self.ctx.scorer.total(&next);

        self.found.push(Candidate {
            choice: self.choice.clone(),
            incidents,
            broken,
            total,
            preserved,
        });
    }
}

/// Backtracking placement of lively / special-needs students so each
/// section lands inside the per-trait target range.
pub fn solve(ctx: &TierContext, scenario: &Scenario, rng: &mut fastrand::Rng) -> TierOutcome {
    let roster = &ctx.scorer.roster;
    let base = &scenario.assignment;
    let m = ctx.section_count();

    let mut order: Vec<StudentId> = roster
        .ids()
        .filter(|&id| !base.is_placed(id) && roster.student(id).has_trait())
        .collect();
    if order.is_empty() {
        debug!("No trait-bearing students left to place");
        return TierOutcome::Unchanged(scenario.clone());
    }
    order.sort_by_key(|&id| {
        let s = roster.student(id);
        Reverse((
            s.lively && s.special_needs,
            s.special_needs,
            s.lively,
            roster.conflict_degree(id),
        ))
    });

    // Placed earlier plus placed now
    let lively_total = roster.students().iter().filter(|s| s.lively).count();
    let special_total = roster.students().iter().filter(|s| s.special_needs).count();

    let mut search = Search {
        ctx,
        base,
        lively: TargetRange::for_total(lively_total, m),
        special: TargetRange::for_total(special_total, m),
        tallies: metrics::tallies(roster, base),
        choice: Vec::with_capacity(order.len()),
        order,
        found: Vec::new(),
        nodes: 0,
        budget: ctx.config.search.trait_node_budget,
    };
    search.dfs(0);

    if search.nodes > search.budget {
        warn!(
            "Trait search hit its node budget ({}); keeping {} candidates",
            search.budget,
            search.found.len()
        );
    }
    if search.found.is_empty() {
        warn!("Trait tier produced no valid placement; passing through");
        return TierOutcome::Unchanged(scenario.clone());
    }

    let limit = ctx.config.search.max_scenarios;
    let found = std::mem::take(&mut search.found);
    let chosen = if found.iter().any(|c| c.incidents == 0) {
        let clean: Vec<Candidate> = found.into_iter().filter(|c| c.incidents == 0).collect();
        take_ranked(clean, |c| (c.broken, c.total), limit, rng)
    } else {
        take_ranked(found, |c| (c.total, Reverse(c.preserved)), limit, rng)
    };

    let out: Vec<Scenario> = chosen
        .into_iter()
        .enumerate()
        .map(|(branch, c)| {
            let mut next = base.clone();
            for (&id, &sec) in search.order.iter().zip(&c.choice) {
                next.place(id, sec, Some(Tier::TraitBalance));
            }
            scenario.derive(next, ctx.scorer, branch)
        })
        .collect();

    info!(
        "Trait balance: {} scenarios after {} nodes",
        out.len(),
        search.nodes
    );
    TierOutcome::Placed(out)
}
