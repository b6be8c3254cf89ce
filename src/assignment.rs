use crate::model::{Group, StudentId};
use crate::optimizer::refine::RefineReport;
use crate::scorer::{ScoreDetails, Scorer};
use crate::solver::cliques::SearchStatus;
use crate::solver::Tier;
use serde::{Deserialize, Serialize};

pub type SectionId = usize;

/// Partial map student -> section, with the tier that placed each student.
///
/// Tallies are never stored here; `scorer::metrics` derives them on demand so
/// they cannot drift from the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    section_count: usize,
    slots: Vec<Option<SectionId>>,
    origin: Vec<Option<Tier>>,
}

impl Assignment {
    pub fn new(student_count: usize, section_count: usize) -> Self {
        Self {
            section_count,
            slots: vec![None; student_count],
            origin: vec![None; student_count],
        }
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }

    pub fn student_count(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn section_of(&self, id: StudentId) -> Option<SectionId> {
        self.slots[id]
    }

    #[inline(always)]
    pub fn is_placed(&self, id: StudentId) -> bool {
        self.slots[id].is_some()
    }

    /// Tier that placed the student. `None` for unplaced students and for
    /// externally seeded placements.
    pub fn origin_of(&self, id: StudentId) -> Option<Tier> {
        self.origin[id]
    }

    pub fn place(&mut self, id: StudentId, section: SectionId, tier: Option<Tier>) {
        debug_assert!(section < self.section_count);
        self.slots[id] = Some(section);
        self.origin[id] = tier;
    }

    /// Moves an already placed student, keeping its origin.
    pub fn reassign(&mut self, id: StudentId, section: SectionId) {
        debug_assert!(self.slots[id].is_some());
        self.slots[id] = Some(section);
    }

    pub fn members(&self, section: SectionId) -> Vec<StudentId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(section))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn populations(&self) -> Vec<usize> {
        let mut pops = vec![0; self.section_count];
        for s in self.slots.iter().flatten() {
            pops[*s] += 1;
        }
        pops
    }

    pub fn placed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn unplaced(&self) -> Vec<StudentId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// True when every member shares one section or none is placed.
    pub fn keeps_together(&self, group: &Group) -> bool {
        let mut sections = group.members.iter().map(|&id| self.slots[id]);
        match sections.next() {
            Some(first) => sections.all(|s| s == first),
            None => true,
        }
    }
}

/// Immutable snapshot of one candidate assignment plus everything the tiers
/// learned while building it. Tiers derive new scenarios instead of editing.
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub assignment: Assignment,
    pub details: ScoreDetails,

    // Atomic units registered by the group-placing tiers
    pub groups: Vec<Group>,

    // === DIAGNOSTICS ===
    pub unplaced: Vec<StudentId>,
    pub broken_links: Vec<(StudentId, StudentId)>,
    pub clique_status: Option<SearchStatus>,
    pub needs_refinement: bool,
    pub refinement: Option<RefineReport>,

    // Branch index taken at every tier that produced this scenario
    pub lineage: Vec<usize>,
}

impl Scenario {
    pub fn new(assignment: Assignment, scorer: &Scorer) -> Self {
        let details = scorer.score(&assignment);
        Self {
            assignment,
            details,
            groups: Vec::new(),
            unplaced: Vec::new(),
            broken_links: Vec::new(),
            clique_status: None,
            needs_refinement: false,
            refinement: None,
            lineage: Vec::new(),
        }
    }

    /// Child scenario with a new assignment; diagnostics carry over.
    pub fn derive(&self, assignment: Assignment, scorer: &Scorer, branch: usize) -> Self {
        let mut next = self.clone();
        next.details = scorer.score(&assignment);
        next.assignment = assignment;
        next.lineage.push(branch);
        next
    }

    pub fn total(&self) -> u32 {
        self.details.total
    }

    pub fn label(&self) -> String {
        if self.lineage.is_empty() {
            return "root".to_string();
        }
        self.lineage
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}
