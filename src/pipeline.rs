use crate::assignment::{Assignment, Scenario};
use crate::config::Config;
use crate::error::{CfResult, ClassForgeError};
use crate::optimizer::refine;
use crate::scorer::Scorer;
use crate::selector;
use crate::solver::{cliques, dyads, leftover, priority, trait_balance};
use crate::solver::{Tier, TierContext, TierOutcome};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct TierReport {
    pub tier: Tier,
    pub input_scenarios: usize,
    pub produced: usize,
    pub kept: usize,
    // Inputs the tier passed through untouched
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub ranked: Vec<Scenario>,
    pub selected: Option<usize>,
    pub reports: Vec<TierReport>,
}

impl PipelineRun {
    pub fn selected(&self) -> Option<&Scenario> {
        self.selected.and_then(|i| self.ranked.get(i))
    }
}

pub struct Pipeline {
    scorer: Arc<Scorer>,
    config: Config,
}

impl Pipeline {
    pub fn new(scorer: Arc<Scorer>, config: Config) -> CfResult<Self> {
        config.validate()?;
        if scorer.section_count != config.sections.section_count {
            return Err(ClassForgeError::Config(format!(
                "scorer built for {} sections, config asks for {}",
                scorer.section_count, config.sections.section_count
            )));
        }
        Ok(Self { scorer, config })
    }

    pub fn scorer(&self) -> &Arc<Scorer> {
        &self.scorer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every tier in order, starting from an empty assignment.
    pub fn run(&self) -> CfResult<PipelineRun> {
        let tiers: Vec<Tier> = Tier::iter().collect();
        self.run_tiers(&tiers, None)
    }

    /// Runs `tiers` in the given order. Students already placed in `seed`
    /// stay where they are and are never moved by refinement.
    pub fn run_tiers(&self, tiers: &[Tier], seed: Option<Assignment>) -> CfResult<PipelineRun> {
        let start = match seed {
            Some(a) => {
                if a.student_count() != self.scorer.roster.len()
                    || a.section_count() != self.config.sections.section_count
                {
                    return Err(ClassForgeError::Validation(format!(
                        "seed assignment covers {} students over {} sections, expected {} over {}",
                        a.student_count(),
                        a.section_count(),
                        self.scorer.roster.len(),
                        self.config.sections.section_count
                    )));
                }
                a
            }
            None => self.scorer.empty_assignment(),
        };

        let base_seed = self.config.search.seed;
        let mut scenarios = vec![Scenario::new(start, &self.scorer)];
        let mut reports = Vec::with_capacity(tiers.len());

        for &tier in tiers {
            let input = scenarios.len();
            let tier_seed = base_seed.wrapping_add(tier.index() as u64 * 1000);

            let outcomes: Vec<TierOutcome> = scenarios
                .par_iter()
                .enumerate()
                .map(|(i, s)| {
                    let mut rng = fastrand::Rng::with_seed(tier_seed.wrapping_add(i as u64));
                    self.expand(tier, s, &mut rng)
                })
                .collect::<CfResult<Vec<_>>>()?;

            let unchanged = outcomes.iter().filter(|o| o.is_unchanged()).count();
            let produced: Vec<Scenario> = outcomes
                .into_iter()
                .flat_map(TierOutcome::into_scenarios)
                .collect();
            let produced_count = produced.len();

            let mut rng = fastrand::Rng::with_seed(tier_seed.wrapping_add(9999));
            scenarios = selector::cap(produced, self.config.search.fanout_cap, &mut rng);

            info!(
                "Tier {}: {} in, {} produced, {} kept, {} unchanged",
                tier,
                input,
                produced_count,
                scenarios.len(),
                unchanged
            );
            reports.push(TierReport {
                tier,
                input_scenarios: input,
                produced: produced_count,
                kept: scenarios.len(),
                unchanged,
            });
        }

        let ranked = selector::rank(scenarios);
        let mut rng = fastrand::Rng::with_seed(base_seed.wrapping_add(99_999));
        let selected = selector::pick(&ranked, &mut rng);
        if let Some(best) = selected.and_then(|i| ranked.get(i)) {
            info!(
                "Selected scenario {} with penalty {} ({} unplaced)",
                best.label(),
                best.total(),
                best.unplaced.len()
            );
        }

        Ok(PipelineRun {
            ranked,
            selected,
            reports,
        })
    }

    fn expand(
        &self,
        tier: Tier,
        scenario: &Scenario,
        rng: &mut fastrand::Rng,
    ) -> CfResult<TierOutcome> {
        let ctx = TierContext::new(&self.scorer, &self.config);
        let outcome = match tier {
            Tier::Priority => priority::solve(&ctx, scenario, rng)?,
            Tier::TraitBalance => trait_balance::solve(&ctx, scenario, rng),
            Tier::Dyads => dyads::solve(&ctx, scenario),
            Tier::Cliques => cliques::solve(&ctx, scenario),
            Tier::Leftover => leftover::solve(&ctx, scenario, rng),
            Tier::Refine => refine::solve(&ctx, scenario),
        };
        Ok(outcome)
    }
}

/// Parses a comma separated tier list such as `priority,dyads,leftover`.
pub fn parse_tiers(list: &str) -> CfResult<Vec<Tier>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Tier>()
                .map_err(|_| ClassForgeError::Config(format!("unknown tier '{}'", s)))
        })
        .collect()
}
