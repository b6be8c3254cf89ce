use super::{Tier, TierContext, TierOutcome};
use crate::assignment::{Assignment, Scenario, SectionId};
use crate::model::{fully_mutual_groups, Group, Roster};
use crate::scorer::metrics::{self, spread, SectionTally};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use strum_macros::Display;
use tracing::{debug, info, warn};

/// How the branch-and-bound search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Whole tree visited; the results are the best there are.
    Exhausted,
    /// Stopped after collecting the configured number of results.
    ResultCap,
    /// Node budget ran out; results are best-found only.
    BudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct CliqueResult {
    pub choice: Vec<SectionId>,
    pub penalty: u32,
    pub needs_refinement: bool,
}

/// Per-group totals cached once before the search.
#[derive(Debug, Clone)]
struct GroupStats {
    group: Group,
    size: usize,
    boys: usize,
    girls: usize,
    good: usize,
}

impl GroupStats {
    fn new(roster: &Roster, group: Group) -> Self {
        Self {
            size: group.len(),
            boys: group.boys(roster),
            girls: group.girls(roster),
            good: group.good_language(roster),
            group,
        }
    }

    fn apply(&self, t: &mut SectionTally) {
        t.population += self.size;
        t.boys += self.boys;
        t.girls += self.girls;
        t.good_language += self.good;
    }

    fn undo(&self, t: &mut SectionTally) {
        t.population -= self.size;
        t.boys -= self.boys;
        t.girls -= self.girls;
        t.good_language -= self.good;
    }
}

struct BranchAndBound<'a> {
    ctx: &'a TierContext<'a>,
    base: &'a Assignment,
    groups: Vec<GroupStats>,

    tallies: Vec<SectionTally>,
    choice: Vec<SectionId>,
    results: Vec<CliqueResult>,

    nodes: usize,
    budget_hit: bool,
}

impl<'a> BranchAndBound<'a> {
    fn done(&self) -> bool {
        self.budget_hit || self.results.len() >= self.ctx.config.search.clique_max_results
    }

    fn dfs(&mut self, idx: usize) {
        self.nodes += 1;
        if self.nodes > self.ctx.config.search.clique_node_budget {
            self.budget_hit = true;
            return;
        }
        if idx == self.groups.len() {
            self.leaf();
            return;
        }

        let capacity = self.ctx.capacity();
        let pop_limit = self.ctx.config.tolerances.clique_population_spread;

        let mut order: Vec<SectionId> = (0..self.tallies.len()).collect();
        order.sort_by_key(|&s| {
            let t = &self.tallies[s];
            (t.population, t.good_language, t.boys + t.girls)
        });

        for sec in order {
            let size = self.groups[idx].size;
            if self.tallies[sec].population + size > capacity {
                continue;
            }

            let g = &self.groups[idx];
            g.apply(&mut self.tallies[sec]);
            self.choice.push(sec);

            if spread(self.tallies.iter().map(|t| t.population)) <= pop_limit {
                self.dfs(idx + 1);
            }

            self.choice.pop();
            let g = &self.groups[idx];
            g.undo(&mut self.tallies[sec]);

            if self.done() {
                return;
            }
        }
    }

    fn leaf(&mut self) {
        let tol = &self.ctx.config.tolerances;
        let d = metrics::deltas(&self.tallies);
        let capacity = self.ctx.capacity();

        if self.tallies.iter().any(|t| t.population > capacity)
            || d.population > tol.clique_population_spread
            || d.language > tol.clique_language_spread
            || d.boys > tol.clique_gender_spread
            || d.girls > tol.clique_gender_spread
        {
            return;
        }

        let needs_refinement = d.population > tol.target_population_spread
            || d.gender > tol.target_gender_spread
            || d.language > tol.target_language_spread;

        let next = materialize(self.base, &self.groups, &self.choice);
        let penalty = self.ctx.scorer.total(&next);
        self.results.push(CliqueResult {
            choice: self.choice.clone(),
            penalty,
            needs_refinement,
        });
    }
}

fn materialize(base: &Assignment, groups: &[GroupStats], choice: &[SectionId]) -> Assignment {
    let mut next = base.clone();
    for (g, &sec) in groups.iter().zip(choice) {
        for &id in &g.group.members {
            next.place(id, sec, Some(Tier::Cliques));
        }
    }
    next
}

/// Branch-and-bound placement of whole fully-mutual groups built from the
/// still unplaced students.
pub fn solve(ctx: &TierContext, scenario: &Scenario) -> TierOutcome {
    let roster = &ctx.scorer.roster;
    let base = &scenario.assignment;
    let pool = base.unplaced();

    let mut groups: Vec<GroupStats> = fully_mutual_groups(roster, &pool)
        .into_iter()
        .map(|g| GroupStats::new(roster, g))
        .collect();
    if groups.is_empty() {
        debug!("No fully mutual groups among unplaced students");
        let mut same = scenario.clone();
        same.clique_status = Some(SearchStatus::Exhausted);
        return TierOutcome::Unchanged(same);
    }
    groups.sort_by_key(|g| Reverse((g.size, g.boys.abs_diff(g.girls), g.good)));

    let mut bb = BranchAndBound {
        ctx,
        base,
        tallies: metrics::tallies(roster, base),
        choice: Vec::with_capacity(groups.len()),
        groups,
        results: Vec::new(),
        nodes: 0,
        budget_hit: false,
    };
    bb.dfs(0);

    let status = if bb.budget_hit {
        warn!(
            "Clique search hit its node budget after {} nodes; results are best-found",
            bb.nodes
        );
        SearchStatus::BudgetExhausted
    } else if bb.results.len() >= ctx.config.search.clique_max_results {
        SearchStatus::ResultCap
    } else {
        SearchStatus::Exhausted
    };

    let mut results = std::mem::take(&mut bb.results);
    if results.is_empty() {
        warn!(
            "Clique tier: no acceptable placement for {} groups ({})",
            bb.groups.len(),
            status
        );
        let mut same = scenario.clone();
        same.clique_status = Some(status);
        return TierOutcome::Unchanged(same);
    }
    results.sort_by_key(|r| r.penalty);
    results.truncate(ctx.config.search.clique_max_results);

    let out: Vec<Scenario> = results
        .into_iter()
        .enumerate()
        .map(|(branch, r)| {
            let next = materialize(base, &bb.groups, &r.choice);
            let mut s = scenario.derive(next, ctx.scorer, branch);
            s.groups.extend(bb.groups.iter().map(|g| g.group.clone()));
            s.clique_status = Some(status);
            s.needs_refinement = r.needs_refinement;
            s
        })
        .collect();

    info!(
        "Cliques: {} groups, {} scenarios, {} nodes, {}",
        bb.groups.len(),
        out.len(),
        bb.nodes,
        status
    );
    TierOutcome::Placed(out)
}
