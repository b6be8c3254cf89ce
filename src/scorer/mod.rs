pub mod metrics;
pub mod penalty;

pub use self::metrics::{BalanceDeltas, BalanceMetrics, SectionTally};
pub use self::penalty::ScoreDetails;
use crate::assignment::Assignment;
use crate::config::{Config, PenaltyWeights};
use crate::model::Roster;

/// Owns the roster and the penalty weights. Shared across scenarios and
/// worker threads behind an `Arc`; scoring never mutates anything.
pub struct Scorer {
    pub roster: Roster,
    pub weights: PenaltyWeights,
    pub section_count: usize,
    pub capacity: usize,
}

impl Scorer {
    pub fn new(roster: Roster, config: &Config) -> Self {
        Self {
            roster,
            weights: config.weights.clone(),
            section_count: config.sections.section_count,
            capacity: config.sections.capacity,
        }
    }

    pub fn metrics(&self, assignment: &Assignment) -> BalanceMetrics {
        metrics::compute(&self.roster, assignment)
    }

    /// Full breakdown. Deterministic for a given assignment.
    pub fn score(&self, assignment: &Assignment) -> ScoreDetails {
        let m = self.metrics(assignment);
        penalty::score(&self.roster, assignment, &m, &self.weights)
    }

    pub fn total(&self, assignment: &Assignment) -> u32 {
        self.score(assignment).total
    }

    pub fn empty_assignment(&self) -> Assignment {
        Assignment::new(self.roster.len(), self.section_count)
    }
}
