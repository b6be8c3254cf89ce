use crate::assignment::{Assignment, Scenario, SectionId};
use crate::model::{Group, Roster, StudentId};
use crate::scorer::metrics::{BalanceMetrics, SectionTally};
use crate::solver::Tier;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which spread a refinement round is trying to shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Language,
    Gender,
    Both,
}

/// Exchange between two sections: `outgoing` moves `from -> to`,
/// `incoming` moves `to -> from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub from: SectionId,
    pub outgoing: Vec<StudentId>,
    pub to: SectionId,
    pub incoming: Vec<StudentId>,
}

impl Swap {
    pub fn moved(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }

    pub fn apply(&self, assignment: &mut Assignment) {
        for &id in &self.outgoing {
            assignment.reassign(id, self.to);
        }
        for &id in &self.incoming {
            assignment.reassign(id, self.from);
        }
    }
}

/// Movable atomic units per section. Students placed by frozen tiers or
/// seeded from outside never appear here.
#[derive(Debug, Clone, Default)]
pub struct UnitIndex {
    pub singles: Vec<Vec<StudentId>>,
    pub groups: Vec<Vec<Group>>,
}

fn movable(assignment: &Assignment, id: StudentId) -> bool {
    matches!(
        assignment.origin_of(id),
        Some(Tier::Dyads | Tier::Cliques | Tier::Leftover)
    )
}

impl UnitIndex {
    pub fn build(scenario: &Scenario) -> Self {
        let a = &scenario.assignment;
        let m = a.section_count();
        let mut singles = vec![Vec::new(); m];
        let mut groups = vec![Vec::new(); m];
        let mut in_group = vec![false; a.student_count()];

        for g in &scenario.groups {
            for &id in &g.members {
                in_group[id] = true;
            }
            let Some(&first) = g.members.first() else { continue };
            let Some(sec) = a.section_of(first) else { continue };
            if a.keeps_together(g) && g.members.iter().all(|&id| movable(a, id)) {
                groups[sec].push(g.clone());
            }
        }

        for id in 0..a.student_count() {
            if in_group[id] || !movable(a, id) {
                continue;
            }
            if let Some(sec) = a.section_of(id) {
                singles[sec].push(id);
            }
        }
        Self { singles, groups }
    }
}

/// `n`-element combinations of `items`, in lexicographic order.
pub fn combinations(items: &[StudentId], n: usize) -> Vec<Vec<StudentId>> {
    fn go(
        items: &[StudentId],
        n: usize,
        start: usize,
        cur: &mut Vec<StudentId>,
        out: &mut Vec<Vec<StudentId>>,
    ) {
        if cur.len() == n {
            out.push(cur.clone());
            return;
        }
        for i in start..items.len() {
            if items.len() - i < n - cur.len() {
                break;
            }
            cur.push(items[i]);
            go(items, n, i + 1, cur, out);
            cur.pop();
        }
    }
    let mut out = Vec::new();
    if n == 0 || n > items.len() {
        return out;
    }
    go(items, n, 0, &mut Vec::with_capacity(n), &mut out);
    out
}

/// Top-`k` sections by `value` descending, and the bottom-`k` taken from
/// the reversed ordering.
fn extremes<F: Fn(&SectionTally) -> usize>(
    tallies: &[SectionTally],
    k: usize,
    value: F,
) -> (Vec<SectionId>, Vec<SectionId>) {
    let mut sorted: Vec<SectionId> = (0..tallies.len()).collect();
    sorted.sort_by_key(|&s| std::cmp::Reverse(value(&tallies[s])));
    let highs = sorted.iter().take(k).copied().collect();
    let lows = sorted.iter().rev().take(k).copied().collect();
    (highs, lows)
}

pub fn language_swaps(
    roster: &Roster,
    units: &UnitIndex,
    metrics: &BalanceMetrics,
    top_k: usize,
) -> Vec<Swap> {
    let good = |id: &StudentId| roster.student(*id).good_language;
    let all_good = |g: &&Group| g.good_language(roster) == g.len();
    let none_good = |g: &&Group| g.good_language(roster) == 0;

    let (highs, lows) = extremes(&metrics.sections, top_k, |t| t.good_language);
    let mut out = Vec::new();
    for &high in &highs {
        for &low in &lows {
            if high == low {
                continue;
            }
            let (low_good, low_weak): (Vec<StudentId>, Vec<StudentId>) =
                units.singles[low].iter().partition(|id| good(id));
            let high_good: Vec<StudentId> =
                units.singles[high].iter().copied().filter(good).collect();

            // single <-> single
            for &i in &high_good {
                for &j in &low_weak {
                    out.push(Swap {
                        from: high,
                        outgoing: vec![i],
                        to: low,
                        incoming: vec![j],
                    });
                }
            }

            // strong group <-> weak group of the same size
            let high_strong: Vec<&Group> = units.groups[high].iter().filter(all_good).collect();
            let low_weak_groups: Vec<&Group> = units.groups[low].iter().filter(none_good).collect();
            for g in &high_strong {
                for h in low_weak_groups.iter().filter(|h| h.len() == g.len()) {
                    out.push(Swap {
                        from: high,
                        outgoing: g.members.clone(),
                        to: low,
                        incoming: h.members.clone(),
                    });
                }
            }

            // strong group <-> as many weak singles
            for g in &high_strong {
                for combo in combinations(&low_weak, g.len()) {
                    out.push(Swap {
                        from: high,
                        outgoing: g.members.clone(),
                        to: low,
                        incoming: combo,
                    });
                }
            }

            // reverse: good singles come up, a weak group goes down
            for g in units.groups[high].iter().filter(none_good) {
                for combo in combinations(&low_good, g.len()) {
                    out.push(Swap {
                        from: low,
                        outgoing: combo,
                        to: high,
                        incoming: g.members.clone(),
                    });
                }
            }
        }
    }
    out
}

pub fn gender_swaps(
    roster: &Roster,
    units: &UnitIndex,
    metrics: &BalanceMetrics,
    top_k: usize,
) -> Vec<Swap> {
    // Work on whichever gender is further apart
    let target_boys = metrics.deltas.boys >= metrics.deltas.girls;
    let is_target = |id: &StudentId| roster.student(*id).is_boy() == target_boys;
    let count_target = |g: &Group| -> usize {
        if target_boys {
            g.boys(roster)
        } else {
            g.girls(roster)
        }
    };

    let (highs, lows) = extremes(&metrics.sections, top_k, |t| {
        if target_boys {
            t.boys
        } else {
            t.girls
        }
    });
    let mut out = Vec::new();
    for &high in &highs {
        for &low in &lows {
            if high == low {
                continue;
            }
            let high_target: Vec<StudentId> =
                units.singles[high].iter().copied().filter(is_target).collect();
            let low_other: Vec<StudentId> = units.singles[low]
                .iter()
                .copied()
                .filter(|id| !is_target(id))
                .collect();

            // single <-> single, same language level first
            for &i in &high_target {
                let lang = roster.student(i).good_language;
                let (same, rest): (Vec<StudentId>, Vec<StudentId>) = low_other
                    .iter()
                    .partition(|&&j| roster.student(j).good_language == lang);
                for j in same.into_iter().chain(rest) {
                    out.push(Swap {
                        from: high,
                        outgoing: vec![i],
                        to: low,
                        incoming: vec![j],
                    });
                }
            }

            let high_groups: Vec<&Group> = units.groups[high]
                .iter()
                .filter(|g| count_target(g) == g.len())
                .collect();
            let low_groups: Vec<&Group> = units.groups[low]
                .iter()
                .filter(|g| count_target(g) == 0)
                .collect();

            for g in &high_groups {
                for h in low_groups.iter().filter(|h| h.len() == g.len()) {
                    out.push(Swap {
                        from: high,
                        outgoing: g.members.clone(),
                        to: low,
                        incoming: h.members.clone(),
                    });
                }
            }

            for g in &high_groups {
                for combo in combinations(&low_other, g.len()) {
                    out.push(Swap {
                        from: high,
                        outgoing: g.members.clone(),
                        to: low,
                        incoming: combo,
                    });
                }
            }
        }
    }
    out
}

pub fn candidates(
    objective: Objective,
    roster: &Roster,
    units: &UnitIndex,
    metrics: &BalanceMetrics,
    top_k: usize,
) -> Vec<Swap> {
    match objective {
        Objective::Language => language_swaps(roster, units, metrics, top_k),
        Objective::Gender => gender_swaps(roster, units, metrics, top_k),
        Objective::Both => {
            let mut all = language_swaps(roster, units, metrics, top_k);
            all.extend(gender_swaps(roster, units, metrics, top_k));
            all
        }
    }
}
