use super::{Tier, TierContext, TierOutcome};
use crate::assignment::{Scenario, SectionId};
use crate::model::{fully_mutual_groups, Group, StudentId};
use crate::scorer::metrics::{self, spread, SectionTally};
use tracing::{debug, info, warn};

/// Sections at the lowest population that still have room.
fn least_populated(tallies: &[SectionTally], capacity: usize) -> Vec<SectionId> {
    let Some(min_pop) = tallies.iter().map(|t| t.population).min() else {
        return Vec::new();
    };
    (0..tallies.len())
        .filter(|&s| tallies[s].population == min_pop && min_pop < capacity)
        .collect()
}

/// Boys spread plus girls spread across `candidates` if the student joins `sec`.
fn gender_impact(
    tallies: &[SectionTally],
    candidates: &[SectionId],
    sec: SectionId,
    boy: bool,
) -> usize {
    let count = |s: SectionId, boys: bool| {
        let t = &tallies[s];
        let base = if boys { t.boys } else { t.girls };
        base + usize::from(s == sec && boy == boys)
    };
    let boys = spread(candidates.iter().map(|&s| count(s, true)));
    let girls = spread(candidates.iter().map(|&s| count(s, false)));
    boys + girls
}

/// Places whatever is still unplaced.
///
/// Fully mutual groups left over by earlier tiers go first, each as a whole
/// into the least populated section that can take all of it. Singles then go
/// to a least populated section, breaking ties by gender balance and then by
/// `rng`. Anyone who finds no room is reported as permanently unplaced.
pub fn solve(ctx: &TierContext, scenario: &Scenario, rng: &mut fastrand::Rng) -> TierOutcome {
    let roster = &ctx.scorer.roster;
    let capacity = ctx.capacity();
    let mut next = scenario.assignment.clone();
    let mut tallies = metrics::tallies(roster, &next);

    let pool = next.unplaced();
    if pool.is_empty() {
        debug!("Nothing left for the leftover tier");
        return TierOutcome::Unchanged(scenario.clone());
    }

    let mut held_back: Vec<StudentId> = Vec::new();
    let mut placed_groups: Vec<Group> = Vec::new();
    for group in fully_mutual_groups(roster, &pool) {
        let target = (0..tallies.len())
            .filter(|&s| tallies[s].population + group.len() <= capacity)
            .min_by_key(|&s| (tallies[s].population, s));
        match target {
            Some(sec) => {
                for &id in &group.members {
                    next.place(id, sec, Some(Tier::Leftover));
                    tallies[sec].add(roster.student(id));
                }
                placed_groups.push(group);
            }
            None => {
                warn!("Group of {} fits in no section; left unplaced", group.len());
                held_back.extend(group.members.iter().copied());
            }
        }
    }

    for id in pool {
        if next.is_placed(id) || held_back.contains(&id) {
            continue;
        }
        let candidates = least_populated(&tallies, capacity);
        let sec = match candidates.len() {
            0 => continue,
            1 => candidates[0],
            _ => {
                let boy = roster.student(id).is_boy();
                let scores: Vec<usize> = candidates
                    .iter()
                    .map(|&s| gender_impact(&tallies, &candidates, s, boy))
                    .collect();
                let best = scores.iter().copied().min().unwrap_or(0);
                let tied: Vec<SectionId> = candidates
                    .iter()
                    .zip(&scores)
                    .filter(|(_, &sc)| sc == best)
                    .map(|(&s, _)| s)
                    .collect();
                tied[rng.usize(..tied.len())]
            }
        };
        next.place(id, sec, Some(Tier::Leftover));
        tallies[sec].add(roster.student(id));
    }

    let unplaced = next.unplaced();
    if !unplaced.is_empty() {
        warn!("{} students could not be placed anywhere", unplaced.len());
    }
    info!(
        "Leftover: {} groups and {} students placed",
        placed_groups.len(),
        next.placed_count() - scenario.assignment.placed_count()
    );

    let mut out = scenario.derive(next, ctx.scorer, 0);
    out.groups.extend(placed_groups);
    out.unplaced = unplaced;
    TierOutcome::Placed(vec![out])
}
