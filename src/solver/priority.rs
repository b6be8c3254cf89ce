use super::{take_ranked, Tier, TierContext, TierOutcome};
use crate::assignment::{Scenario, SectionId};
use crate::error::{CfResult, ClassForgeError};
use crate::model::{Roster, StudentId};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Label-independent form of a partition: per-section sorted names, with the
/// section lists themselves sorted.
pub type Signature = Vec<Vec<String>>;

pub fn signature(
    roster: &Roster,
    members: &[StudentId],
    choice: &[SectionId],
    section_count: usize,
) -> Signature {
    let mut by_section: Vec<Vec<String>> = vec![Vec::new(); section_count];
    for (&id, &sec) in members.iter().zip(choice) {
        by_section[sec].push(roster.name(id).to_string());
    }
    for names in &mut by_section {
        names.sort();
    }
    by_section.sort();
    by_section
}

/// Mutual pairs split apart plus mutual triads not kept whole, inside the subset.
pub fn breakage(roster: &Roster, members: &[StudentId], choice: &[SectionId]) -> usize {
    let section = |id: StudentId| members.iter().position(|&m| m == id).map(|i| choice[i]);

    let pairs = roster
        .mutual_pairs_within(members)
        .into_iter()
        .filter(|&(a, b)| section(a) != section(b))
        .count();
    let triads = roster
        .mutual_triads_within(members)
        .into_iter()
        .filter(|t| !(section(t[0]) == section(t[1]) && section(t[1]) == section(t[2])))
        .count();
    pairs + triads
}

/// Population spread of the subset alone must stay within 1, and a single
/// section may not hold everybody.
fn counts_ok(counts: &[usize]) -> bool {
    let total: usize = counts.iter().sum();
    let hi = counts.iter().copied().max().unwrap_or(0);
    let lo = counts.iter().copied().min().unwrap_or(0);
    if hi - lo > 1 {
        return false;
    }
    !(counts.len() > 1 && total > 0 && hi == total)
}

struct Enumerator<'a> {
    roster: &'a Roster,
    members: &'a [StudentId],
    section_count: usize,
    ceiling: usize,
    // Room left in each section before this tier places anyone
    room: Vec<usize>,
    node_limit: u64,

    choice: Vec<SectionId>,
    counts: Vec<usize>,
    seen: HashSet<Signature>,
    found: Vec<Vec<SectionId>>,
    nodes: u64,
    limit_hit: bool,
}

impl<'a> Enumerator<'a> {
    fn dfs(&mut self, depth: usize) {
        if self.limit_hit {
            return;
        }
        self.nodes += 1;
        if self.nodes > self.node_limit {
            self.limit_hit = true;
            return;
        }
        if depth == self.members.len() {
            if !counts_ok(&self.counts) {
                return;
            }
            let sig = signature(self.roster, self.members, &self.choice, self.section_count);
            if self.seen.insert(sig) {
                self.found.push(self.choice.clone());
            }
            return;
        }

        let id = self.members[depth];
        for sec in 0..self.section_count {
            // No subset section may exceed ceil(k / m) if the spread is to stay within 1
            if self.counts[sec] + 1 > self.ceiling || self.counts[sec] + 1 > self.room[sec] {
                continue;
            }
            let clash = (0..depth).any(|j| {
                self.choice[j] == sec && self.roster.in_conflict(id, self.members[j])
            });
            if clash {
                continue;
            }

            self.choice.push(sec);
            self.counts[sec] += 1;
            self.dfs(depth + 1);
            self.counts[sec] -= 1;
            self.choice.pop();
        }
    }
}

/// Places the unplaced teacher-affiliated students.
///
/// Up to `section_count` of them go round-robin, one per section, skipping
/// sections that are already full. Beyond that every conflict-free, evenly
/// spread partition that fits the remaining capacity is enumerated,
/// deduplicated by signature and ranked by how many mutual friendships it
/// breaks.
pub fn solve(
    ctx: &TierContext,
    scenario: &Scenario,
    rng: &mut fastrand::Rng,
) -> CfResult<TierOutcome> {
    let roster = &ctx.scorer.roster;
    let m = ctx.section_count();
    let members: Vec<StudentId> = roster
        .ids()
        .filter(|&id| roster.student(id).teacher_child && !scenario.assignment.is_placed(id))
        .collect();
    let k = members.len();

    if k == 0 {
        debug!("No priority students to place");
        return Ok(TierOutcome::Unchanged(scenario.clone()));
    }

    let capacity = ctx.capacity();
    let room: Vec<usize> = scenario
        .assignment
        .populations()
        .into_iter()
        .map(|p| capacity.saturating_sub(p))
        .collect();

    if k <= m {
        return Ok(round_robin(ctx, scenario, &members, room));
    }

    let mut e = Enumerator {
        roster,
        members: &members,
        section_count: m,
        ceiling: k.div_ceil(m),
        room,
        node_limit: ctx.config.search.priority_enumeration_limit,
        choice: Vec::with_capacity(k),
        counts: vec![0; m],
        seen: HashSet::new(),
        found: Vec::new(),
        nodes: 0,
        limit_hit: false,
    };
    e.dfs(0);
    if e.limit_hit {
        return Err(ClassForgeError::Config(format!(
            "priority enumeration of {} students over {} sections passed {} nodes",
            k, m, e.node_limit
        )));
    }
    debug!("Priority enumeration: {} nodes, {} unique partitions", e.nodes, e.found.len());

    if e.found.is_empty() {
        warn!("Priority: no valid partition of {} students", k);
        return Ok(TierOutcome::Unchanged(scenario.clone()));
    }

    let scored: Vec<(usize, Vec<SectionId>)> = e
        .found
        .into_iter()
        .map(|c| (breakage(roster, &members, &c), c))
        .collect();
    let chosen = take_ranked(scored, |t| t.0, ctx.config.search.max_scenarios, rng);

    let out: Vec<Scenario> = chosen
        .into_iter()
        .enumerate()
        .map(|(branch, (_, choice))| {
            let mut next = scenario.assignment.clone();
            for (&id, &sec) in members.iter().zip(&choice) {
                next.place(id, sec, Some(Tier::Priority));
            }
            scenario.derive(next, ctx.scorer, branch)
        })
        .collect();

    info!("Priority: {} scenarios from {} students", out.len(), k);
    Ok(TierOutcome::Placed(out))
}

fn round_robin(
    ctx: &TierContext,
    scenario: &Scenario,
    members: &[StudentId],
    mut room: Vec<usize>,
) -> TierOutcome {
    let m = room.len();
    let mut used = vec![false; m];
    let mut next = scenario.assignment.clone();
    let mut skipped = 0;

    for (i, &id) in members.iter().enumerate() {
        let target = (0..m)
            .map(|step| (i + step) % m)
            .find(|&sec| !used[sec] && room[sec] > 0);
        match target {
            Some(sec) => {
                used[sec] = true;
                room[sec] -= 1;
                next.place(id, sec, Some(Tier::Priority));
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Priority: {} students left unplaced, no section has room", skipped);
    }
    if skipped == members.len() {
        return TierOutcome::Unchanged(scenario.clone());
    }
    info!("Priority: {} students placed round-robin", members.len() - skipped);
    TierOutcome::Placed(vec![scenario.derive(next, ctx.scorer, 0)])
}
