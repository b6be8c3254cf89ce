#![allow(dead_code)]

use classforge::assignment::Scenario;
use classforge::config::Config;
use classforge::model::{Gender, Roster, Student};
use classforge::scorer::Scorer;
use classforge::solver::TierContext;

pub fn boy(name: &str) -> Student {
    Student::new(name, Gender::Male)
}

pub fn girl(name: &str) -> Student {
    Student::new(name, Gender::Female)
}

/// Two students who name each other.
pub fn mutual(mut a: Student, mut b: Student) -> (Student, Student) {
    a.friends.push(b.name.clone());
    b.friends.push(a.name.clone());
    (a, b)
}

pub fn config(sections: usize, capacity: usize) -> Config {
    let mut cfg = Config::default();
    cfg.sections.section_count = sections;
    cfg.sections.capacity = capacity;
    cfg
}

pub fn roster(students: Vec<Student>) -> Roster {
    Roster::new(students).expect("fixture roster is valid")
}

pub fn scorer(students: Vec<Student>, cfg: &Config) -> Scorer {
    Scorer::new(roster(students), cfg)
}

pub fn empty_scenario(scorer: &Scorer) -> Scenario {
    Scenario::new(scorer.empty_assignment(), scorer)
}

pub fn ctx<'a>(scorer: &'a Scorer, cfg: &'a Config) -> TierContext<'a> {
    TierContext::new(scorer, cfg)
}

/// `n` students alternating boy/girl, every third one with good language.
pub fn plain_class(prefix: &str, n: usize) -> Vec<Student> {
    (0..n)
        .map(|i| {
            let name = format!("{}{:02}", prefix, i);
            let s = if i % 2 == 0 { boy(&name) } else { girl(&name) };
            s.with_language(i % 3 == 0)
        })
        .collect()
}
