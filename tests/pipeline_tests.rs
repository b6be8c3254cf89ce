mod common;

use classforge::assignment::Scenario;
use classforge::config::Config;
use classforge::error::ClassForgeError;
use classforge::model::Student;
use classforge::pipeline::Pipeline;
use classforge::scorer::Scorer;
use classforge::selector;
use classforge::solver::Tier;
use common::{boy, config, girl, mutual, roster, scorer};
use std::sync::Arc;

/// A small but busy class: teacher children, trait bearers, pairs, a triad
/// and a conflict.
fn busy_class() -> Vec<Student> {
    let (a, b) = mutual(boy("Alex"), boy("Basil"));
    let (c, d) = mutual(girl("Chloe"), girl("Daphne"));
    let mut v = vec![
        boy("Teo").with_teacher_child(true).with_language(true),
        girl("Tina").with_teacher_child(true),
        boy("Leo").with_lively(true).with_conflicts(["Sam"]),
        girl("Lia").with_lively(true),
        boy("Sam").with_special_needs(true).with_language(true),
        a.with_language(true),
        b,
        c.with_language(true),
        d,
        boy("Ektor").with_friends(["Fotis", "Giota"]),
        boy("Fotis").with_friends(["Ektor", "Giota"]).with_language(true),
        girl("Giota").with_friends(["Ektor", "Fotis"]),
    ];
    for i in 0..12 {
        let name = format!("Kid{:02}", i);
        let s = if i % 2 == 0 { girl(&name) } else { boy(&name) };
        v.push(s.with_language(i % 3 == 0));
    }
    v
}

fn pipeline(cfg: Config) -> Pipeline {
    let sc = Arc::new(Scorer::new(roster(busy_class()), &cfg));
    Pipeline::new(sc, cfg).expect("valid pipeline")
}

#[test]
fn test_full_run_places_everyone() {
    let p = pipeline(config(2, 15));
    let run = p.run().expect("run succeeds");

    assert_eq!(run.reports.len(), 6);
    assert!(run.reports.iter().all(|r| r.kept <= p.config().search.fanout_cap));

    let best = run.selected().expect("a scenario is selected");
    assert!(best.unplaced.is_empty());
    assert_eq!(best.assignment.placed_count(), p.scorer().roster.len());
    assert!(best.assignment.populations().iter().all(|&n| n <= 15));
    assert!(best.groups.iter().all(|g| best.assignment.keeps_together(g)));
    assert!(best.refinement.is_some());

    // Teacher children are split across sections
    let teo = best.assignment.section_of(0);
    let tina = best.assignment.section_of(1);
    assert_ne!(teo, tina);
}

#[test]
fn test_same_seed_same_result() {
    let a = pipeline(config(3, 10)).run().expect("first run");
    let b = pipeline(config(3, 10)).run().expect("second run");

    let view = |r: &classforge::pipeline::PipelineRun| {
        r.ranked
            .iter()
            .map(|s| (s.assignment.clone(), s.total(), s.lineage.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(view(&a), view(&b));
    assert_eq!(a.selected, b.selected);
}

#[test]
fn test_ranking_is_ascending() {
    let run = pipeline(config(2, 15)).run().expect("run");
    let keys: Vec<_> = run.ranked.iter().map(selector::rank_key).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_seeded_students_stay_put() {
    let cfg = config(2, 15);
    let p = pipeline(cfg);
    let mut seed = p.scorer().empty_assignment();
    // Kid00 and Kid01 fixed in the second section
    seed.place(12, 1, None);
    seed.place(13, 1, None);

    let run = p.run_tiers(&[Tier::Leftover, Tier::Refine], Some(seed)).expect("run");
    let best = run.selected().expect("selected");
    assert_eq!(best.assignment.section_of(12), Some(1));
    assert_eq!(best.assignment.section_of(13), Some(1));
    assert_eq!(best.assignment.origin_of(12), None);
}

#[test]
fn test_seed_with_wrong_shape_is_rejected() {
    let p = pipeline(config(2, 15));
    let seed = classforge::assignment::Assignment::new(3, 2);
    assert!(matches!(
        p.run_tiers(&[Tier::Leftover], Some(seed)),
        Err(ClassForgeError::Validation(_))
    ));
}

#[test]
fn test_section_count_mismatch_is_rejected() {
    let sc = Arc::new(scorer(busy_class(), &config(2, 15)));
    assert!(matches!(
        Pipeline::new(sc, config(3, 15)),
        Err(ClassForgeError::Config(_))
    ));
}

#[test]
fn test_tier_failure_aborts_the_run() {
    let mut cfg = config(2, 15);
    cfg.search.priority_enumeration_limit = 1;
    let students: Vec<Student> = (0..4)
        .map(|i| boy(&format!("T{}", i)).with_teacher_child(true))
        .collect();
    let sc = Arc::new(scorer(students, &cfg));
    let p = Pipeline::new(sc, cfg).expect("pipeline");
    assert!(matches!(p.run(), Err(ClassForgeError::Config(_))));
}

// --- SELECTOR ---

fn scenario_with_total(sc: &Scorer, total: u32, lineage: usize) -> Scenario {
    let mut s = Scenario::new(sc.empty_assignment(), sc);
    s.details.total = total;
    s.lineage.push(lineage);
    s
}

#[test]
fn test_selector_picks_among_leaders_only() {
    let sc = scorer(vec![boy("A"), girl("B")], &config(2, 25));
    let ranked = selector::rank(vec![
        scenario_with_total(&sc, 9, 0),
        scenario_with_total(&sc, 3, 1),
        scenario_with_total(&sc, 3, 2),
        scenario_with_total(&sc, 5, 3),
    ]);
    assert_eq!(ranked[0].lineage, vec![1]);
    assert_eq!(ranked[1].lineage, vec![2]);

    for seed in 0..20 {
        let pick = selector::pick(&ranked, &mut fastrand::Rng::with_seed(seed)).unwrap();
        assert!(pick < 2);
    }
    assert_eq!(selector::pick(&[], &mut fastrand::Rng::with_seed(1)), None);
}

#[test]
fn test_selector_cap_keeps_the_best() {
    let sc = scorer(vec![boy("A"), girl("B")], &config(2, 25));
    let all: Vec<Scenario> = (0..8).map(|i| scenario_with_total(&sc, 8 - i, i as usize)).collect();
    let kept = selector::cap(all, 3, &mut fastrand::Rng::with_seed(5));
    let totals: Vec<u32> = kept.iter().map(|s| s.total()).collect();
    assert_eq!(totals, vec![1, 2, 3]);
}

#[test]
fn test_priority_students_never_overfill_sections() {
    let cfg = config(2, 2);
    let mut students: Vec<Student> = (0..5)
        .map(|i| boy(&format!("T{}", i)).with_teacher_child(true))
        .collect();
    students.push(girl("Plain"));
    let sc = Arc::new(Scorer::new(roster(students), &cfg));
    let run = Pipeline::new(sc, cfg).expect("valid pipeline").run().expect("run succeeds");

    for s in &run.ranked {
        assert!(s.assignment.populations().iter().all(|&n| n <= 2));
        assert_eq!(s.assignment.placed_count(), 4);
    }
    let best = run.selected().expect("a scenario is selected");
    assert_eq!(best.assignment.unplaced().len(), 2);
}
