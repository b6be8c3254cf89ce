use super::{Tier, TierContext, TierOutcome};
use crate::assignment::{Assignment, Scenario, SectionId};
use crate::model::{Roster, StudentId};
use tracing::{debug, info, warn};

/// Sections reachable through already placed mutual friends, ascending.
fn targets(roster: &Roster, assignment: &Assignment, id: StudentId) -> Vec<SectionId> {
    let mut secs: Vec<SectionId> = roster
        .mutual_friends(id)
        .iter()
        .filter_map(|&f| assignment.section_of(f))
        .collect();
    secs.sort_unstable();
    secs.dedup();
    secs
}

/// Attaches unplaced students to the section of an already placed mutual
/// friend. Students with fewer target sections go first. Newly attached
/// students become anchors for their own friends on the next pass.
///
/// A student whose friend sections are all full stays unplaced and its
/// links are reported as broken.
pub fn solve(ctx: &TierContext, scenario: &Scenario) -> TierOutcome {
    let roster = &ctx.scorer.roster;
    let capacity = ctx.capacity();
    let mut next = scenario.assignment.clone();
    let mut pops = next.populations();
    let mut attached = 0;

    loop {
        let mut queue: Vec<(usize, usize, StudentId, Vec<SectionId>)> = roster
            .ids()
            .filter(|&id| !next.is_placed(id))
            .filter_map(|id| {
                let t = targets(roster, &next, id);
                if t.is_empty() {
                    return None;
                }
                let min_pop = t.iter().map(|&s| pops[s]).min().unwrap_or(0);
                Some((t.len(), min_pop, id, t))
            })
            .collect();
        if queue.is_empty() {
            break;
        }
        queue.sort_by_key(|(n, pop, id, _)| (*n, *pop, *id));

        let mut progressed = false;
        for (_, _, id, mut secs) in queue {
            // Earlier placements in this pass may have filled a target
            secs.sort_by_key(|&s| (pops[s], s));
            if let Some(&sec) = secs.iter().find(|&&s| pops[s] < capacity) {
                next.place(id, sec, Some(Tier::Dyads));
                pops[sec] += 1;
                attached += 1;
                progressed = true;
                debug!("Attached '{}' to section {}", roster.name(id), sec);
            }
        }
        if !progressed {
            break;
        }
    }

    let mut broken_links = Vec::new();
    for id in roster.ids().filter(|&id| !next.is_placed(id)) {
        for &f in roster.mutual_friends(id) {
            if next.is_placed(f) {
                broken_links.push((id, f));
            }
        }
    }
    if !broken_links.is_empty() {
        warn!(
            "{} friendship links could not be honoured, target sections full",
            broken_links.len()
        );
    }

    if attached == 0 && broken_links.is_empty() {
        return TierOutcome::Unchanged(scenario.clone());
    }

    info!("Dyads: attached {} students", attached);
    let mut out = scenario.derive(next, ctx.scorer, 0);
    out.broken_links.extend(broken_links);
    TierOutcome::Placed(vec![out])
}
