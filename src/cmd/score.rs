use crate::reports;
use clap::Args;
use classforge::config::Config;
use classforge::error::CfResult;
use classforge::loader;
use classforge::scorer::Scorer;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub config: Config,

    /// Roster CSV
    #[arg(short, long)]
    pub input: String,

    /// `name,section` CSV to evaluate
    #[arg(short, long)]
    pub assignment: String,
}

pub fn run(args: ScoreArgs, config: Config, scorer: Arc<Scorer>) -> CfResult<()> {
    let labels = config.section_labels();
    let assignment = loader::load_assignment(&args.assignment, &scorer.roster, &labels)?;

    println!("\n🔎 === ASSIGNMENT AUDIT === 🔎");
    let unplaced = assignment.unplaced();
    if !unplaced.is_empty() {
        println!("⚠️  {} students have no section in {}", unplaced.len(), args.assignment);
    }

    let metrics = scorer.metrics(&assignment);
    reports::print_section_tallies(&labels, &metrics);
    reports::print_breakdown(&scorer.score(&assignment));
    Ok(())
}
