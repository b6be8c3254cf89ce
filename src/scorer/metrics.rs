use crate::assignment::Assignment;
use crate::model::{Roster, Student};
use serde::{Deserialize, Serialize};

/// Running counts for one section. Always derived from an `Assignment`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTally {
    pub population: usize,
    pub boys: usize,
    pub girls: usize,
    pub good_language: usize,
    pub lively: usize,
    pub special: usize,
    pub teacher_children: usize,
}

impl SectionTally {
    #[inline(always)]
    pub fn add(&mut self, s: &Student) {
        self.population += 1;
        self.boys += s.is_boy() as usize;
        self.girls += s.is_girl() as usize;
        self.good_language += s.good_language as usize;
        self.lively += s.lively as usize;
        self.special += s.special_needs as usize;
        self.teacher_children += s.teacher_child as usize;
    }

    #[inline(always)]
    pub fn remove(&mut self, s: &Student) {
        self.population -= 1;
        self.boys -= s.is_boy() as usize;
        self.girls -= s.is_girl() as usize;
        self.good_language -= s.good_language as usize;
        self.lively -= s.lively as usize;
        self.special -= s.special_needs as usize;
        self.teacher_children -= s.teacher_child as usize;
    }
}

/// Cross-section max - min per dimension. `gender` is the larger of the
/// boys and girls spreads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDeltas {
    pub population: usize,
    pub boys: usize,
    pub girls: usize,
    pub gender: usize,
    pub language: usize,
    pub lively: usize,
    pub special: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMetrics {
    pub sections: Vec<SectionTally>,
    pub deltas: BalanceDeltas,
}

/// max - min, or 0 for an empty sequence.
pub fn spread<I: IntoIterator<Item = usize>>(values: I) -> usize {
    let mut it = values.into_iter();
    let Some(first) = it.next() else {
        return 0;
    };
    let (lo, hi) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    hi - lo
}

pub fn tallies(roster: &Roster, assignment: &Assignment) -> Vec<SectionTally> {
    let mut out = vec![SectionTally::default(); assignment.section_count()];
    for id in roster.ids() {
        if let Some(sec) = assignment.section_of(id) {
            out[sec].add(roster.student(id));
        }
    }
    out
}

pub fn deltas(sections: &[SectionTally]) -> BalanceDeltas {
    let boys = spread(sections.iter().map(|t| t.boys));
    let girls = spread(sections.iter().map(|t| t.girls));
    BalanceDeltas {
        population: spread(sections.iter().map(|t| t.population)),
        boys,
        girls,
        gender: boys.max(girls),
        language: spread(sections.iter().map(|t| t.good_language)),
        lively: spread(sections.iter().map(|t| t.lively)),
        special: spread(sections.iter().map(|t| t.special)),
    }
}

pub fn compute(roster: &Roster, assignment: &Assignment) -> BalanceMetrics {
    let sections = tallies(roster, assignment);
    let deltas = deltas(&sections);
    BalanceMetrics { sections, deltas }
}
