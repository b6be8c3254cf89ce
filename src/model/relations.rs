use super::{Roster, StudentId};
use serde::{Deserialize, Serialize};

/// A fully mutual friendship clique treated as one placement unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub members: Vec<StudentId>,
}

impl Group {
    pub fn new(mut members: Vec<StudentId>) -> Self {
        members.sort_unstable();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: StudentId) -> bool {
        self.members.contains(&id)
    }

    pub fn boys(&self, roster: &Roster) -> usize {
        self.members
            .iter()
            .filter(|&&id| roster.student(id).is_boy())
            .count()
    }

    pub fn girls(&self, roster: &Roster) -> usize {
        self.members
            .iter()
            .filter(|&&id| roster.student(id).is_girl())
            .count()
    }

    pub fn good_language(&self, roster: &Roster) -> usize {
        self.members
            .iter()
            .filter(|&&id| roster.student(id).good_language)
            .count()
    }
}

/// Disjoint fully-mutual groups over `pool`.
///
/// Triads claim their members first, scanning the pool lexicographically;
/// pairs are then built from whoever is left. Students with an empty friend
/// list never take part.
pub fn fully_mutual_groups(roster: &Roster, pool: &[StudentId]) -> Vec<Group> {
    let eligible: Vec<StudentId> = pool
        .iter()
        .copied()
        .filter(|&id| !roster.declared_friends(id).is_empty())
        .collect();

    let mut claimed = vec![false; roster.len()];
    let mut groups = Vec::new();

    for triad in roster.mutual_triads_within(&eligible) {
        if triad.iter().any(|&id| claimed[id]) {
            continue;
        }
        for &id in &triad {
            claimed[id] = true;
        }
        groups.push(Group::new(triad.to_vec()));
    }

    for (a, b) in roster.mutual_pairs_within(&eligible) {
        if claimed[a] || claimed[b] {
            continue;
        }
        claimed[a] = true;
        claimed[b] = true;
        groups.push(Group::new(vec![a, b]));
    }

    groups
}
