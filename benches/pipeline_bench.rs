use classforge::config::Config;
use classforge::model::{Gender, Roster, Student};
use classforge::pipeline::Pipeline;
use classforge::scorer::Scorer;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

fn synthetic_roster(n: usize, seed: u64) -> Roster {
    let mut rng = fastrand::Rng::with_seed(seed);
    let names: Vec<String> = (0..n).map(|i| format!("S{:03}", i)).collect();

    let mut students: Vec<Student> = names
        .iter()
        .map(|name| {
            let gender = if rng.bool() { Gender::Male } else { Gender::Female };
            Student::new(name.clone(), gender)
                .with_language(rng.u8(..10) < 6)
                .with_teacher_child(rng.u8(..20) == 0)
                .with_lively(rng.u8(..10) == 0)
                .with_special_needs(rng.u8(..12) == 0)
        })
        .collect();

    // Mutual pairs plus a sprinkle of one-way friendships and conflicts
    for i in (0..n.saturating_sub(1)).step_by(4) {
        students[i].friends.push(names[i + 1].clone());
        students[i + 1].friends.push(names[i].clone());
    }
    for i in 0..n {
        if rng.u8(..8) == 0 {
            let other = rng.usize(..n);
            students[i].conflicts.push(names[other].clone());
        }
    }
    Roster::new(students).expect("synthetic roster is valid")
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut config = Config::default();
    config.sections.section_count = 2;
    config.sections.capacity = 25;

    let scorer = Arc::new(Scorer::new(synthetic_roster(50, 7), &config));
    let pipeline = Pipeline::new(scorer.clone(), config).expect("valid config");

    let run = pipeline.run().expect("pipeline runs");
    let best = run.selected().expect("a scenario").assignment.clone();

    c.bench_function("score (50 students, 2 sections)", |b| {
        b.iter(|| scorer.score(black_box(&best)))
    });

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.bench_function("full run (50 students)", |b| b.iter(|| pipeline.run()));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
