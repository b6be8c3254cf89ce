pub mod cliques;
pub mod dyads;
pub mod leftover;
pub mod priority;
pub mod trait_balance;

use crate::assignment::Scenario;
use crate::config::Config;
use crate::scorer::Scorer;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Pipeline phases in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Priority,
    TraitBalance,
    Dyads,
    Cliques,
    Leftover,
    Refine,
}

impl Tier {
    /// Placements made by these tiers are never moved afterwards.
    pub fn is_frozen(self) -> bool {
        matches!(self, Tier::Priority | Tier::TraitBalance)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// What a tier did with one input scenario.
#[derive(Debug, Clone)]
pub enum TierOutcome {
    /// One or more extended scenarios.
    Placed(Vec<Scenario>),
    /// Nothing placed; the (possibly annotated) input carries on.
    Unchanged(Scenario),
}

impl TierOutcome {
    pub fn into_scenarios(self) -> Vec<Scenario> {
        match self {
            TierOutcome::Placed(v) => v,
            TierOutcome::Unchanged(s) => vec![s],
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, TierOutcome::Unchanged(_))
    }
}

/// Borrowed view every tier solver receives.
#[derive(Clone, Copy)]
pub struct TierContext<'a> {
    pub scorer: &'a Scorer,
    pub config: &'a Config,
}

impl<'a> TierContext<'a> {
    pub fn new(scorer: &'a Scorer, config: &'a Config) -> Self {
        Self { scorer, config }
    }

    pub fn capacity(&self) -> usize {
        self.config.sections.capacity
    }

    pub fn section_count(&self) -> usize {
        self.config.sections.section_count
    }
}

/// Keeps at most `limit` items, best keys first.
///
/// Items are stably sorted by key. Whole runs of equal keys are taken while
/// they fit; the run straddling the limit is sampled with `rng`. Survivors
/// keep their sorted order.
pub fn take_ranked<T, K, F>(
    mut items: Vec<T>,
    key: F,
    limit: usize,
    rng: &mut fastrand::Rng,
) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    items.sort_by_key(|t| key(t));
    if items.len() <= limit {
        return items;
    }

    let mut out = Vec::with_capacity(limit);
    let mut rest = items.into_iter().peekable();
    while out.len() < limit {
        let Some(first) = rest.next() else { break };
        let k = key(&first);
        let mut run = vec![first];
        while rest.peek().is_some_and(|t| key(t) == k) {
            if let Some(t) = rest.next() {
                run.push(t);
            }
        }

        let room = limit - out.len();
        if run.len() <= room {
            out.extend(run);
        } else {
            let mut picks: Vec<usize> = (0..run.len()).collect();
            rng.shuffle(&mut picks);
            picks.truncate(room);
            picks.sort_unstable();
            let mut slots: Vec<Option<T>> = run.into_iter().map(Some).collect();
            for i in picks {
                if let Some(t) = slots[i].take() {
                    out.push(t);
                }
            }
        }
    }
    out
}
