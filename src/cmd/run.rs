use crate::reports;
use clap::Args;
use classforge::config::Config;
use classforge::error::CfResult;
use classforge::loader;
use classforge::pipeline::{parse_tiers, Pipeline};
use classforge::scorer::Scorer;
use classforge::solver::Tier;
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: Config,

    /// Roster CSV
    #[arg(short, long)]
    pub input: String,

    /// Comma separated tiers to run, default all
    #[arg(short, long)]
    pub tiers: Option<String>,

    /// `name,section` CSV of placements to start from
    #[arg(long)]
    pub seed_assignment: Option<String>,

    /// Write a JSON summary here
    #[arg(long)]
    pub json: Option<String>,

    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

pub fn run(args: RunArgs, config: Config, scorer: Arc<Scorer>) -> CfResult<()> {
    let labels = config.section_labels();
    let tiers: Vec<Tier> = match &args.tiers {
        Some(list) => parse_tiers(list)?,
        None => Tier::iter().collect(),
    };
    let seed = match &args.seed_assignment {
        Some(path) => Some(loader::load_assignment(path, &scorer.roster, &labels)?),
        None => None,
    };

    println!(
        "🔥 Running {} tiers over {} students into {} sections",
        tiers.len(),
        scorer.roster.len(),
        labels.len()
    );
    let start = Instant::now();
    let pipeline = Pipeline::new(scorer.clone(), config)?;
    let run = pipeline.run_tiers(&tiers, seed)?;
    println!("⏱️  Done in {:.2?}", start.elapsed());

    reports::print_tier_reports(&run.reports);
    reports::print_ranking(&run.ranked, run.selected, args.top);

    if let Some(best) = run.selected() {
        let metrics = scorer.metrics(&best.assignment);
        reports::print_section_tallies(&labels, &metrics);
        reports::print_breakdown(&best.details);
        reports::print_diagnostics(best, &scorer.roster);
    }

    if let Some(path) = &args.json {
        reports::write_json_summary(path, &run, &scorer, &labels)?;
        println!("💾 Summary written to {}", path);
    }
    Ok(())
}
