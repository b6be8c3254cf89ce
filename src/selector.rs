use crate::assignment::Scenario;
use crate::solver::take_ranked;
use tracing::debug;

/// (total penalty, population spread, gender spread, language spread)
pub type RankKey = (u32, usize, usize, usize);

pub fn rank_key(s: &Scenario) -> RankKey {
    let d = &s.details;
    (d.total, d.population_delta, d.gender_delta, d.language_delta)
}

/// Stable ascending sort by `rank_key`.
pub fn rank(mut scenarios: Vec<Scenario>) -> Vec<Scenario> {
    scenarios.sort_by_key(rank_key);
    scenarios
}

/// Index of the pick inside `ranked`, drawn among the scenarios that tie
/// with the leader on every key.
pub fn pick(ranked: &[Scenario], rng: &mut fastrand::Rng) -> Option<usize> {
    let lead = rank_key(ranked.first()?);
    let tied = ranked.iter().take_while(|s| rank_key(s) == lead).count();
    debug!("Selector: {} scenarios tie for first", tied);
    Some(rng.usize(..tied))
}

/// Bounds fan-out between tiers.
pub fn cap(scenarios: Vec<Scenario>, limit: usize, rng: &mut fastrand::Rng) -> Vec<Scenario> {
    take_ranked(scenarios, rank_key, limit, rng)
}
