pub mod relations;
pub mod student;

pub use self::relations::{fully_mutual_groups, Group};
pub use self::student::{Gender, Student};

use crate::error::{CfResult, ClassForgeError};
use std::collections::HashMap;
use tracing::debug;

pub type StudentId = usize;

/// Immutable population with resolved relationship tables.
///
/// Declarations are directional as stored. A friendship only counts as
/// mutual when both sides declared it; a conflict counts when either side did.
#[derive(Debug, Clone)]
pub struct Roster {
    students: Vec<Student>,
    index: HashMap<String, StudentId>,

    // Resolved declarations (unknown names and self references dropped)
    declared_friends: Vec<Vec<StudentId>>,
    declared_conflicts: Vec<Vec<StudentId>>,

    // Derived, sorted for binary search
    mutual: Vec<Vec<StudentId>>,
    conflict_adj: Vec<Vec<StudentId>>,
}

impl Roster {
    pub fn new(students: Vec<Student>) -> CfResult<Self> {
        let mut index = HashMap::with_capacity(students.len());
        for (id, s) in students.iter().enumerate() {
            let name = s.name.trim();
            if name.is_empty() {
                return Err(ClassForgeError::Validation(format!(
                    "student at row {} has an empty name",
                    id + 1
                )));
            }
            if index.insert(name.to_string(), id).is_some() {
                return Err(ClassForgeError::Validation(format!(
                    "duplicate student name '{}'",
                    name
                )));
            }
        }

        let resolve = |own: StudentId, names: &[String]| -> Vec<StudentId> {
            let mut out: Vec<StudentId> = Vec::with_capacity(names.len());
            for n in names {
                match index.get(n.trim()) {
                    Some(&other) if other != own => {
                        if !out.contains(&other) {
                            out.push(other);
                        }
                    }
                    Some(_) => {}
                    None => {
                        debug!("Dropping unknown reference '{}' from '{}'", n, students[own].name)
                    }
                }
            }
            out
        };

        let declared_friends: Vec<Vec<StudentId>> = students
            .iter()
            .enumerate()
            .map(|(id, s)| resolve(id, &s.friends))
            .collect();
        let declared_conflicts: Vec<Vec<StudentId>> = students
            .iter()
            .enumerate()
            .map(|(id, s)| resolve(id, &s.conflicts))
            .collect();

        let n = students.len();
        let mut mutual = vec![Vec::new(); n];
        for a in 0..n {
            for &b in &declared_friends[a] {
                if a < b && declared_friends[b].contains(&a) {
                    mutual[a].push(b);
                    mutual[b].push(a);
                }
            }
        }

        let mut conflict_adj = vec![Vec::new(); n];
        for a in 0..n {
            for &b in &declared_conflicts[a] {
                if !conflict_adj[a].contains(&b) {
                    conflict_adj[a].push(b);
                }
                if !conflict_adj[b].contains(&a) {
                    conflict_adj[b].push(a);
                }
            }
        }

        for list in mutual.iter_mut().chain(conflict_adj.iter_mut()) {
            list.sort_unstable();
        }

        Ok(Self {
            students,
            index,
            declared_friends,
            declared_conflicts,
            mutual,
            conflict_adj,
        })
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, id: StudentId) -> &Student {
        &self.students[id]
    }

    pub fn name(&self, id: StudentId) -> &str {
        &self.students[id].name
    }

    pub fn id_of(&self, name: &str) -> Option<StudentId> {
        self.index.get(name.trim()).copied()
    }

    pub fn ids(&self) -> std::ops::Range<StudentId> {
        0..self.students.len()
    }

    pub fn declared_friends(&self, id: StudentId) -> &[StudentId] {
        &self.declared_friends[id]
    }

    pub fn declared_conflicts(&self, id: StudentId) -> &[StudentId] {
        &self.declared_conflicts[id]
    }

    pub fn mutual_friends(&self, id: StudentId) -> &[StudentId] {
        &self.mutual[id]
    }

    pub fn is_mutual(&self, a: StudentId, b: StudentId) -> bool {
        self.mutual[a].binary_search(&b).is_ok()
    }

    pub fn in_conflict(&self, a: StudentId, b: StudentId) -> bool {
        self.conflict_adj[a].binary_search(&b).is_ok()
    }

    pub fn conflict_degree(&self, id: StudentId) -> usize {
        self.conflict_adj[id].len()
    }

    /// All mutual pairs `(a, b)` with `a < b`, in id order.
    pub fn mutual_pairs(&self) -> Vec<(StudentId, StudentId)> {
        let mut pairs = Vec::new();
        for a in self.ids() {
            for &b in &self.mutual[a] {
                if a < b {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Mutual pairs whose members both belong to `subset`.
    pub fn mutual_pairs_within(&self, subset: &[StudentId]) -> Vec<(StudentId, StudentId)> {
        let mut pairs = Vec::new();
        for (i, &a) in subset.iter().enumerate() {
            for &b in &subset[i + 1..] {
                if self.is_mutual(a, b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Fully mutual triads inside `subset`, in lexicographic subset order.
    pub fn mutual_triads_within(&self, subset: &[StudentId]) -> Vec<[StudentId; 3]> {
        let mut triads = Vec::new();
        for (i, &a) in subset.iter().enumerate() {
            for (j, &b) in subset.iter().enumerate().skip(i + 1) {
                if !self.is_mutual(a, b) {
                    continue;
                }
                for &c in &subset[j + 1..] {
                    if self.is_mutual(a, c) && self.is_mutual(b, c) {
                        triads.push([a, b, c]);
                    }
                }
            }
        }
        triads
    }

    /// Conflicting pairs inside `subset`, declared from either side.
    pub fn conflict_pairs_within(&self, subset: &[StudentId]) -> Vec<(StudentId, StudentId)> {
        let mut pairs = Vec::new();
        for (i, &a) in subset.iter().enumerate() {
            for &b in &subset[i + 1..] {
                if self.in_conflict(a, b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}
