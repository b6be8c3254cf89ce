mod common;

use classforge::assignment::Scenario;
use classforge::error::ClassForgeError;
use classforge::model::Student;
use classforge::scorer::metrics::spread;
use classforge::solver::cliques::SearchStatus;
use classforge::solver::priority::signature;
use classforge::solver::{cliques, dyads, leftover, priority, trait_balance, Tier, TierOutcome};
use common::{boy, config, ctx, empty_scenario, girl, mutual, plain_class, scorer};
use std::collections::HashSet;

fn rng() -> fastrand::Rng {
    fastrand::Rng::with_seed(42)
}

fn placed(outcome: TierOutcome) -> Vec<Scenario> {
    match outcome {
        TierOutcome::Placed(v) => v,
        TierOutcome::Unchanged(_) => panic!("tier left the scenario unchanged"),
    }
}

// --- PRIORITY ---

#[test]
fn test_priority_round_robin_when_few() {
    let cfg = config(3, 25);
    let sc = scorer(
        vec![
            boy("A").with_teacher_child(true),
            girl("B"),
            girl("C").with_teacher_child(true),
        ],
        &cfg,
    );
    let out = placed(priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap());
    assert_eq!(out.len(), 1);
    let a = &out[0].assignment;
    assert_eq!(a.section_of(0), Some(0));
    assert_eq!(a.section_of(2), Some(1));
    assert!(!a.is_placed(1));
    assert_eq!(a.origin_of(0), Some(Tier::Priority));
}

fn priority_class() -> Vec<Student> {
    let (t2, t3) = mutual(girl("T2"), girl("T3"));
    vec![
        boy("T0").with_conflicts(["T1"]),
        boy("T1"),
        t2,
        t3,
        boy("T4"),
        girl("T5"),
        boy("Other"),
    ]
    .into_iter()
    .map(|s| {
        let is_teacher = s.name.starts_with('T');
        s.with_teacher_child(is_teacher)
    })
    .collect()
}

#[test]
fn test_priority_enumeration_respects_rules() {
    let cfg = config(2, 25);
    let sc = scorer(priority_class(), &cfg);
    let out = placed(priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap());

    assert_eq!(out.len(), cfg.search.max_scenarios);
    let teachers: Vec<usize> = (0..6).collect();
    let mut signatures = HashSet::new();
    for s in &out {
        let a = &s.assignment;
        let counts: Vec<usize> = (0..2)
            .map(|sec| teachers.iter().filter(|&&id| a.section_of(id) == Some(sec)).count())
            .collect();
        assert!(spread(counts.iter().copied()) <= 1);
        assert_ne!(a.section_of(0), a.section_of(1), "conflicting pair shares a section");
        assert!(!a.is_placed(6));

        let choice: Vec<usize> = teachers.iter().map(|&id| a.section_of(id).unwrap()).collect();
        assert!(signatures.insert(signature(&sc.roster, &teachers, &choice, 2)));
    }

    // Only two partitions keep T2 and T3 together; both rank first
    let together = |s: &Scenario| s.assignment.section_of(2) == s.assignment.section_of(3);
    assert!(together(&out[0]) && together(&out[1]));
    assert!(out[2..].iter().all(|s| !together(s)));
}

#[test]
fn test_priority_enumeration_limit_is_a_config_error() {
    let mut cfg = config(2, 25);
    cfg.search.priority_enumeration_limit = 10;
    let sc = scorer(priority_class(), &cfg);
    let result = priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng());
    assert!(matches!(result, Err(ClassForgeError::Config(_))));
}

#[test]
fn test_priority_without_valid_partition_passes_through() {
    let cfg = config(2, 25);
    let sc = scorer(
        vec![
            boy("A").with_teacher_child(true).with_conflicts(["B", "C"]),
            boy("B").with_teacher_child(true).with_conflicts(["C"]),
            girl("C").with_teacher_child(true),
        ],
        &cfg,
    );
    let outcome = priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap();
    assert!(outcome.is_unchanged());
}

fn teachers(prefix: &str, n: usize) -> Vec<Student> {
    (0..n)
        .map(|i| {
            let name = format!("{}{:02}", prefix, i);
            let s = if i % 2 == 0 { boy(&name) } else { girl(&name) };
            s.with_teacher_child(true)
        })
        .collect()
}

fn section_counts(s: &Scenario, ids: &[usize], sections: usize) -> Vec<usize> {
    (0..sections)
        .map(|sec| ids.iter().filter(|&&id| s.assignment.section_of(id) == Some(sec)).count())
        .collect()
}

#[test]
fn test_priority_thirteen_students_over_two_sections() {
    let cfg = config(2, 25);
    let mut students = teachers("T", 13);
    students[0] = students[0].clone().with_conflicts(["T01"]);
    students[2] = students[2].clone().with_conflicts(["T03", "T04"]);
    let (a, b) = mutual(students[5].clone(), students[6].clone());
    students[5] = a;
    students[6] = b;
    let sc = scorer(students, &cfg);

    let out = placed(priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap());
    assert!(!out.is_empty() && out.len() <= 5);

    let ids: Vec<usize> = (0..13).collect();
    for s in &out {
        // Enumeration placed everyone, not just one per section
        assert_eq!(s.assignment.placed_count(), 13);
        assert!(ids.iter().all(|&id| s.assignment.origin_of(id) == Some(Tier::Priority)));
        assert!(spread(section_counts(s, &ids, 2)) <= 1);
        for (x, y) in [(0, 1), (2, 3), (2, 4)] {
            assert_ne!(s.assignment.section_of(x), s.assignment.section_of(y));
        }
        assert_eq!(s.assignment.section_of(5), s.assignment.section_of(6));
    }
}

#[test]
fn test_priority_twelve_students_over_four_sections_fits_default_limit() {
    let cfg = config(4, 25);
    let mut students = teachers("T", 12);
    students.extend(plain_class("P", 8));
    let sc = scorer(students, &cfg);

    let out = placed(priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap());
    assert_eq!(out.len(), cfg.search.max_scenarios);
    let ids: Vec<usize> = (0..12).collect();
    for s in &out {
        assert_eq!(section_counts(s, &ids, 4), vec![3, 3, 3, 3]);
    }
}

#[test]
fn test_priority_enumeration_cannot_exceed_capacity() {
    let cfg = config(2, 2);
    let sc = scorer(teachers("T", 5), &cfg);
    let outcome = priority::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()).unwrap();
    assert!(outcome.is_unchanged());
}

#[test]
fn test_priority_enumeration_counts_students_already_placed() {
    let cfg = config(2, 3);
    let mut students = teachers("T", 5);
    students.push(girl("Seeded"));
    let sc = scorer(students, &cfg);
    let mut seeded = sc.empty_assignment();
    seeded.place(5, 0, None);
    let start = Scenario::new(seeded, &sc);

    let out = placed(priority::solve(&ctx(&sc, &cfg), &start, &mut rng()).unwrap());
    let ids: Vec<usize> = (0..5).collect();
    for s in &out {
        assert!(s.assignment.populations().iter().all(|&p| p <= 3));
        assert_eq!(section_counts(s, &ids, 2), vec![2, 3]);
    }
}

#[test]
fn test_priority_round_robin_skips_full_sections() {
    let cfg = config(2, 2);
    let mut students = plain_class("P", 2);
    students.extend(teachers("T", 2));
    let sc = scorer(students, &cfg);
    let mut seeded = sc.empty_assignment();
    seeded.place(0, 0, None);
    seeded.place(1, 0, None);
    let start = Scenario::new(seeded, &sc);

    let out = placed(priority::solve(&ctx(&sc, &cfg), &start, &mut rng()).unwrap());
    let a = &out[0].assignment;
    assert_eq!(a.section_of(2), Some(1));
    // One per section, and the only other section is full
    assert!(!a.is_placed(3));
    assert_eq!(a.populations(), vec![2, 1]);
}

// --- TRAIT BALANCE ---

#[test]
fn test_trait_students_are_spread_and_kept_apart_from_conflicts() {
    let cfg = config(2, 25);
    let sc = scorer(
        vec![
            boy("X"),
            boy("L0").with_lively(true).with_conflicts(["X"]),
            girl("L1").with_lively(true),
            girl("Plain"),
        ],
        &cfg,
    );
    let mut seeded = sc.empty_assignment();
    seeded.place(0, 0, None);
    let start = Scenario::new(seeded, &sc);

    let out = placed(trait_balance::solve(&ctx(&sc, &cfg), &start, &mut rng()));
    assert!(!out.is_empty());
    for s in &out {
        let a = &s.assignment;
        assert_eq!(a.section_of(1), Some(1));
        assert_eq!(a.section_of(2), Some(0));
        assert!(!a.is_placed(3));
        assert_eq!(a.origin_of(1), Some(Tier::TraitBalance));
        assert_eq!(s.details.trait_incidents, 0);
    }
}

#[test]
fn test_trait_targets_bound_every_section() {
    let cfg = config(2, 25);
    let sc = scorer(
        vec![
            boy("S0").with_special_needs(true),
            girl("S1").with_special_needs(true),
            boy("S2").with_special_needs(true),
            girl("L0").with_lively(true),
        ],
        &cfg,
    );
    let out = placed(trait_balance::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()));
    assert!(out.len() <= cfg.search.max_scenarios);
    for s in &out {
        let m = sc.metrics(&s.assignment);
        for t in &m.sections {
            assert!((1..=2).contains(&t.special));
            assert!(t.lively <= 1);
        }
    }
}

#[test]
fn test_trait_tier_without_bearers_is_unchanged() {
    let cfg = config(2, 25);
    let sc = scorer(plain_class("P", 4), &cfg);
    let outcome = trait_balance::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng());
    assert!(outcome.is_unchanged());
}

// --- DYADS ---

fn dyad_class(fillers: usize) -> Vec<Student> {
    let (f, u) = mutual(boy("Friend"), girl("Newcomer"));
    let mut v = vec![f, u];
    v.extend(plain_class("F", fillers));
    v
}

#[test]
fn test_dyad_joins_friend_below_capacity() {
    // Section 0 holds 24 of 25
    let cfg = config(2, 25);
    let sc = scorer(dyad_class(23), &cfg);
    let mut seeded = sc.empty_assignment();
    seeded.place(0, 0, None);
    for id in 2..25 {
        seeded.place(id, 0, None);
    }
    let start = Scenario::new(seeded, &sc);

    let out = placed(dyads::solve(&ctx(&sc, &cfg), &start));
    let a = &out[0].assignment;
    assert_eq!(a.section_of(1), Some(0));
    assert_eq!(a.origin_of(1), Some(Tier::Dyads));
    assert_eq!(a.populations()[0], 25);
    assert!(out[0].broken_links.is_empty());
}

#[test]
fn test_dyad_full_section_reports_broken_link() {
    // Section 0 already at 25 of 25
    let cfg = config(2, 25);
    let sc = scorer(dyad_class(24), &cfg);
    let mut seeded = sc.empty_assignment();
    seeded.place(0, 0, None);
    for id in 2..26 {
        seeded.place(id, 0, None);
    }
    let start = Scenario::new(seeded, &sc);

    let out = placed(dyads::solve(&ctx(&sc, &cfg), &start));
    let s = &out[0];
    assert!(!s.assignment.is_placed(1));
    assert_eq!(s.broken_links, vec![(1, 0)]);
}

#[test]
fn test_dyads_follow_chains() {
    let cfg = config(2, 25);
    let sc = scorer(
        vec![
            boy("Anchor").with_friends(["Mid"]),
            girl("Mid").with_friends(["Anchor", "Tail"]),
            boy("Tail").with_friends(["Mid"]),
            girl("Alone"),
        ],
        &cfg,
    );
    let mut seeded = sc.empty_assignment();
    seeded.place(0, 1, Some(Tier::Priority));
    let start = Scenario::new(seeded, &sc);

    let out = placed(dyads::solve(&ctx(&sc, &cfg), &start));
    let a = &out[0].assignment;
    assert_eq!(a.section_of(1), Some(1));
    assert_eq!(a.section_of(2), Some(1));
    assert!(!a.is_placed(3));
}

#[test]
fn test_dyads_with_nobody_to_attach_is_unchanged() {
    let cfg = config(2, 25);
    let sc = scorer(plain_class("P", 4), &cfg);
    assert!(dyads::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)).is_unchanged());
}

// --- CLIQUES ---

#[test]
fn test_triad_larger_than_capacity_is_left_alone() {
    let cfg = config(2, 2);
    let sc = scorer(
        vec![
            boy("A").with_friends(["B", "C"]),
            boy("B").with_friends(["A", "C"]),
            girl("C").with_friends(["A", "B"]),
        ],
        &cfg,
    );
    match cliques::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)) {
        TierOutcome::Unchanged(s) => {
            assert_eq!(s.assignment.placed_count(), 0);
            assert_eq!(s.clique_status, Some(SearchStatus::Exhausted));
        }
        TierOutcome::Placed(_) => panic!("triad cannot fit into sections of 2"),
    }
}

#[test]
fn test_pairs_are_placed_whole_and_balanced() {
    let cfg = config(2, 25);
    let (a, b) = mutual(boy("A"), boy("B"));
    let (c, d) = mutual(girl("C"), girl("D"));
    let sc = scorer(vec![a, b, c, d, boy("Solo")], &cfg);

    let out = placed(cliques::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)));
    assert!(!out.is_empty());
    assert!(out.len() <= cfg.search.clique_max_results);
    for s in &out {
        assert_eq!(s.groups.len(), 2);
        assert!(s.groups.iter().all(|g| s.assignment.keeps_together(g)));
        assert!(s.clique_status.is_some());
        assert!(!s.assignment.is_placed(4));
        assert_eq!(s.assignment.origin_of(0), Some(Tier::Cliques));
        // Both pairs in one section would leave a spread of 4
        assert_ne!(s.assignment.section_of(0), s.assignment.section_of(2));
    }
}

#[test]
fn test_cliques_without_groups_report_exhausted() {
    let cfg = config(2, 25);
    let sc = scorer(plain_class("P", 4), &cfg);
    match cliques::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)) {
        TierOutcome::Unchanged(s) => assert_eq!(s.clique_status, Some(SearchStatus::Exhausted)),
        TierOutcome::Placed(_) => panic!("nothing to place"),
    }
}

#[test]
fn test_clique_budget_exhaustion_keeps_best_found() {
    let mut cfg = config(2, 25);
    cfg.search.clique_node_budget = 2;
    let (a, b) = mutual(boy("A"), girl("B"));
    let sc = scorer(vec![a, b], &cfg);

    let out = placed(cliques::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].clique_status, Some(SearchStatus::BudgetExhausted));
    assert!(out[0].assignment.keeps_together(&out[0].groups[0]));
}

#[test]
fn test_clique_result_cap_stops_search() {
    let mut cfg = config(2, 25);
    cfg.search.clique_max_results = 1;
    let (a, b) = mutual(boy("A"), girl("B"));
    let (c, d) = mutual(boy("C"), girl("D"));
    let sc = scorer(vec![a, b, c, d], &cfg);

    let out = placed(cliques::solve(&ctx(&sc, &cfg), &empty_scenario(&sc)));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].clique_status, Some(SearchStatus::ResultCap));
    assert_eq!(out[0].assignment.populations(), vec![2, 2]);
}

#[test]
fn test_clique_result_past_fine_tolerance_needs_refinement() {
    let cfg = config(2, 25);
    let (a, b) = mutual(boy("A").with_language(true), girl("B").with_language(true));
    let (c, d) = mutual(boy("C").with_language(true), girl("D").with_language(true));
    let mut students = vec![a, b, c, d];
    students.extend([boy("W0"), girl("W1"), boy("W2"), girl("W3")]);
    let sc = scorer(students, &cfg);
    let mut seeded = sc.empty_assignment();
    for id in 4..8 {
        seeded.place(id, 1, None);
    }
    let start = Scenario::new(seeded, &sc);

    let out = placed(cliques::solve(&ctx(&sc, &cfg), &start));
    assert_eq!(out.len(), 1);
    let s = &out[0];
    // Language spread of 4 passes the coarse check but not the target of 3
    assert_eq!(sc.metrics(&s.assignment).deltas.language, 4);
    assert!(s.needs_refinement);
    assert_eq!(s.clique_status, Some(SearchStatus::Exhausted));
}

// --- LEFTOVER ---

#[test]
fn test_leftover_balances_population_and_gender() {
    let cfg = config(2, 25);
    let sc = scorer(plain_class("S", 10), &cfg);
    let out = placed(leftover::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()));
    let s = &out[0];
    assert_eq!(s.assignment.placed_count(), 10);
    assert!(s.unplaced.is_empty());
    let d = sc.metrics(&s.assignment).deltas;
    assert!(d.population <= 1);
    assert!(d.gender <= 1);
}

#[test]
fn test_leftover_reports_students_beyond_capacity() {
    let cfg = config(2, 2);
    let sc = scorer(plain_class("S", 5), &cfg);
    let out = placed(leftover::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()));
    let s = &out[0];
    assert_eq!(s.assignment.populations(), vec![2, 2]);
    assert_eq!(s.unplaced.len(), 1);
}

#[test]
fn test_leftover_never_splits_a_group() {
    let cfg = config(2, 2);
    let sc = scorer(
        vec![
            boy("A").with_friends(["B", "C"]),
            boy("B").with_friends(["A", "C"]),
            girl("C").with_friends(["A", "B"]),
            girl("D"),
        ],
        &cfg,
    );
    let out = placed(leftover::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()));
    let s = &out[0];
    assert_eq!(s.unplaced, vec![0, 1, 2]);
    assert!(s.assignment.is_placed(3));
}

#[test]
fn test_leftover_places_pairs_together() {
    let cfg = config(2, 25);
    let (a, b) = mutual(boy("A"), girl("B"));
    let mut students = vec![a, b];
    students.extend(plain_class("S", 6));
    let sc = scorer(students, &cfg);

    let out = placed(leftover::solve(&ctx(&sc, &cfg), &empty_scenario(&sc), &mut rng()));
    let s = &out[0];
    assert_eq!(s.assignment.section_of(0), s.assignment.section_of(1));
    assert_eq!(s.groups.len(), 1);
    assert!(sc.metrics(&s.assignment).deltas.population <= 1);
}
