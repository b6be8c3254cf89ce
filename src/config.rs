use crate::error::{CfResult, ClassForgeError};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub sections: SectionParams,
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub weights: PenaltyWeights,
    #[command(flatten)]
    pub tolerances: Tolerances,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionParams {
    #[arg(long, default_value_t = 2)]
    pub section_count: usize,
    #[arg(long, default_value_t = 25)]
    pub capacity: usize,
    #[arg(long, default_value = "A")]
    pub section_prefix: String,
}

impl Default for SectionParams {
    fn default() -> Self {
        Self {
            section_count: 2,
            capacity: 25,
            section_prefix: "A".to_string(),
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = 20_250_822)]
    pub seed: u64,

    // Per-tier result cap and the selector cap between tiers
    #[arg(long, default_value_t = 5)]
    pub max_scenarios: usize,
    #[arg(long, default_value_t = 5)]
    pub fanout_cap: usize,

    // Search nodes the exhaustive priority enumeration may visit before giving up
    #[arg(long, default_value_t = 4_194_304)]
    pub priority_enumeration_limit: u64,

    #[arg(long, default_value_t = 500_000)]
    pub trait_node_budget: usize,
    #[arg(long, default_value_t = 200_000)]
    pub clique_node_budget: usize,
    #[arg(long, default_value_t = 5)]
    pub clique_max_results: usize,

    #[arg(long, default_value_t = 5)]
    pub refine_max_rounds: usize,
    #[arg(long, default_value_t = 2)]
    pub refine_top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            seed: 20_250_822,
            max_scenarios: 5,
            fanout_cap: 5,
            priority_enumeration_limit: 4_194_304,
            trait_node_budget: 500_000,
            clique_node_budget: 200_000,
            clique_max_results: 5,
            refine_max_rounds: 5,
            refine_top_k: 2,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    // === BALANCE (excess beyond tolerance) ===
    #[arg(long, default_value_t = 1)]
    pub population_tolerance: u32,
    #[arg(long, default_value_t = 3)]
    pub population_weight: u32,
    #[arg(long, default_value_t = 2)]
    pub language_tolerance: u32,
    #[arg(long, default_value_t = 1)]
    pub language_weight: u32,
    #[arg(long, default_value_t = 1)]
    pub gender_tolerance: u32,
    #[arg(long, default_value_t = 2)]
    pub gender_weight: u32,

    // === CO-LOCATED TRAIT PAIRS ===
    #[arg(long, default_value_t = 5)]
    pub conflict_both_special: u32,
    #[arg(long, default_value_t = 4)]
    pub conflict_special_lively: u32,
    #[arg(long, default_value_t = 3)]
    pub conflict_both_lively: u32,

    // === RELATIONSHIPS ===
    #[arg(long, default_value_t = 5)]
    pub broken_friendship: u32,
    #[arg(long, default_value_t = false)]
    pub count_unplaced_as_broken: bool,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            population_tolerance: 1,
            population_weight: 3,
            language_tolerance: 2,
            language_weight: 1,
            gender_tolerance: 1,
            gender_weight: 2,
            conflict_both_special: 5,
            conflict_special_lively: 4,
            conflict_both_lively: 3,
            broken_friendship: 5,
            count_unplaced_as_broken: false,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    // Coarse acceptance for whole-group placement
    #[arg(long, default_value_t = 2)]
    pub clique_population_spread: usize,
    #[arg(long, default_value_t = 4)]
    pub clique_gender_spread: usize,
    #[arg(long, default_value_t = 4)]
    pub clique_language_spread: usize,

    // Refinement targets
    #[arg(long, default_value_t = 2)]
    pub target_population_spread: usize,
    #[arg(long, default_value_t = 3)]
    pub target_gender_spread: usize,
    #[arg(long, default_value_t = 3)]
    pub target_language_spread: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            clique_population_spread: 2,
            clique_gender_spread: 4,
            clique_language_spread: 4,
            target_population_spread: 2,
            target_gender_spread: 3,
            target_language_spread: 3,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CfResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> CfResult<()> {
        if self.sections.section_count < 2 {
            return Err(ClassForgeError::Config(format!(
                "at least 2 sections are required, got {}",
                self.sections.section_count
            )));
        }
        if self.sections.capacity == 0 {
            return Err(ClassForgeError::Config(
                "section capacity must be positive".to_string(),
            ));
        }
        if self.search.max_scenarios == 0 || self.search.fanout_cap == 0 {
            return Err(ClassForgeError::Config(
                "scenario caps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Section labels in index order: `A1`, `A2`, ...
    pub fn section_labels(&self) -> Vec<String> {
        (1..=self.sections.section_count)
            .map(|i| format!("{}{}", self.sections.section_prefix, i))
            .collect()
    }

    /// Overwrites fields with values the user typed on the command line,
    /// leaving file-provided values alone where clap only supplied a default.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident, $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(sections, section_count);
        update_if_present!(sections, capacity);
        update_if_present!(sections, section_prefix);

        update_if_present!(search, seed);
        update_if_present!(search, max_scenarios);
        update_if_present!(search, fanout_cap);
        update_if_present!(search, priority_enumeration_limit);
        update_if_present!(search, trait_node_budget);
        update_if_present!(search, clique_node_budget);
        update_if_present!(search, clique_max_results);
        update_if_present!(search, refine_max_rounds);
        update_if_present!(search, refine_top_k);

        update_if_present!(weights, population_tolerance);
        update_if_present!(weights, population_weight);
        update_if_present!(weights, language_tolerance);
        update_if_present!(weights, language_weight);
        update_if_present!(weights, gender_tolerance);
        update_if_present!(weights, gender_weight);
        update_if_present!(weights, conflict_both_special);
        update_if_present!(weights, conflict_special_lively);
        update_if_present!(weights, conflict_both_lively);
        update_if_present!(weights, broken_friendship);
        update_if_present!(weights, count_unplaced_as_broken);

        update_if_present!(tolerances, clique_population_spread);
        update_if_present!(tolerances, clique_gender_spread);
        update_if_present!(tolerances, clique_language_spread);
        update_if_present!(tolerances, target_population_spread);
        update_if_present!(tolerances, target_gender_spread);
        update_if_present!(tolerances, target_language_spread);
    }
}
