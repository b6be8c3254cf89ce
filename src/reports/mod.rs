use classforge::assignment::Scenario;
use classforge::error::CfResult;
use classforge::model::Roster;
use classforge::pipeline::{PipelineRun, TierReport};
use classforge::scorer::{BalanceMetrics, ScoreDetails, Scorer};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;
use std::fs;

fn right_align(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

pub fn print_tier_reports(reports: &[TierReport]) {
    println!("\n🧱 === TIERS === 🧱");
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Tier").add_attribute(Attribute::Bold),
        Cell::new("In"),
        Cell::new("Produced"),
        Cell::new("Kept").fg(Color::Cyan),
        Cell::new("Passed"),
    ]);
    for r in reports {
        table.add_row(vec![
            Cell::new(r.tier.to_string()),
            Cell::new(r.input_scenarios),
            Cell::new(r.produced),
            Cell::new(r.kept).fg(Color::Cyan),
            Cell::new(r.unchanged),
        ]);
    }
    right_align(&mut table, 1, 4);
    println!("{}", table);
}

pub fn print_ranking(ranked: &[Scenario], selected: Option<usize>, top: usize) {
    println!("\n🏆 === RANKING === 🏆");
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Scenario"),
        Cell::new("Total").fg(Color::Cyan),
        Cell::new("ΔPop"),
        Cell::new("ΔGen"),
        Cell::new("ΔLang"),
        Cell::new("Traits").fg(Color::Red),
        Cell::new("Broken").fg(Color::Red),
        Cell::new("Unplaced"),
    ]);

    for (i, s) in ranked.iter().enumerate().take(top) {
        let marker = if selected == Some(i) { "★" } else { "" };
        let d = &s.details;
        table.add_row(vec![
            Cell::new(format!("{}{}", i + 1, marker)).add_attribute(Attribute::Bold),
            Cell::new(s.label()),
            Cell::new(d.total).fg(Color::Cyan),
            Cell::new(d.population_delta),
            Cell::new(d.gender_delta),
            Cell::new(d.language_delta),
            Cell::new(d.trait_incidents).fg(Color::Red),
            Cell::new(d.broken_friendships).fg(Color::Red),
            Cell::new(s.assignment.student_count() - s.assignment.placed_count()),
        ]);
    }
    right_align(&mut table, 2, 8);
    println!("{}", table);
    if ranked.len() > top {
        println!("   ... {} more scenarios not shown", ranked.len() - top);
    }
}

pub fn print_section_tallies(labels: &[String], metrics: &BalanceMetrics) {
    println!("\n🏫 === SECTIONS === 🏫");
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Section").add_attribute(Attribute::Bold),
        Cell::new("Pop").fg(Color::Cyan),
        Cell::new("Boys"),
        Cell::new("Girls"),
        Cell::new("Lang"),
        Cell::new("Lively"),
        Cell::new("Special"),
        Cell::new("Teacher"),
    ]);
    for (label, t) in labels.iter().zip(&metrics.sections) {
        table.add_row(vec![
            Cell::new(label).add_attribute(Attribute::Bold),
            Cell::new(t.population).fg(Color::Cyan),
            Cell::new(t.boys),
            Cell::new(t.girls),
            Cell::new(t.good_language),
            Cell::new(t.lively),
            Cell::new(t.special),
            Cell::new(t.teacher_children),
        ]);
    }
    let d = &metrics.deltas;
    table.add_row(vec![
        Cell::new("Δ").fg(Color::Yellow),
        Cell::new(d.population).fg(Color::Yellow),
        Cell::new(d.boys).fg(Color::Yellow),
        Cell::new(d.girls).fg(Color::Yellow),
        Cell::new(d.language).fg(Color::Yellow),
        Cell::new(d.lively).fg(Color::Yellow),
        Cell::new(d.special).fg(Color::Yellow),
        Cell::new(""),
    ]);
    right_align(&mut table, 1, 7);
    println!("{}", table);
}

pub fn print_breakdown(d: &ScoreDetails) {
    println!("\n🧮 === PENALTY BREAKDOWN === 🧮");
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(vec![
        Cell::new("Component").add_attribute(Attribute::Bold),
        Cell::new("Measured"),
        Cell::new("Penalty").fg(Color::Cyan),
    ]);

    let rows: [(&str, usize, u32); 5] = [
        ("Population spread", d.population_delta, d.population_penalty),
        ("Gender spread", d.gender_delta, d.gender_penalty),
        ("Language spread", d.language_delta, d.language_penalty),
        ("Trait conflicts", d.trait_incidents, d.trait_penalty),
        ("Broken friendships", d.broken_friendships, d.broken_penalty),
    ];
    for (name, measured, penalty) in rows {
        let color = if penalty == 0 { Color::Green } else { Color::Red };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(measured),
            Cell::new(penalty).fg(color),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(d.total).add_attribute(Attribute::Bold).fg(Color::Cyan),
    ]);
    right_align(&mut table, 1, 2);
    println!("{}", table);

    if d.hard_conflicts > 0 {
        println!("⚠️  {} declared conflict pairs share a section", d.hard_conflicts);
    }
}

pub fn print_diagnostics(s: &Scenario, roster: &Roster) {
    println!("\n🩺 === DIAGNOSTICS ({}) === 🩺", s.label());

    if s.unplaced.is_empty() {
        println!("   ✅ Every student placed");
    } else {
        let names: Vec<&str> = s.unplaced.iter().map(|&id| roster.name(id)).collect();
        println!("   ⚠️  Unplaced ({}): {}", names.len(), names.join(", "));
    }

    for &(a, b) in &s.broken_links {
        println!("   💔 {} could not join {}", roster.name(a), roster.name(b));
    }

    if let Some(status) = s.clique_status {
        println!("   🔗 Clique search: {}", status);
    }
    if s.needs_refinement {
        println!("   🛠️  Clique placement exceeded the fine targets");
    }

    if let Some(r) = &s.refinement {
        let trace: Vec<String> = r.penalty_trace.iter().map(|p| p.to_string()).collect();
        println!(
            "   🔄 Refinement: {} after {} rounds, {} swaps, penalty {}",
            r.status,
            r.rounds,
            r.swaps.len(),
            trace.join(" → ")
        );
        for sw in &r.swaps {
            let out: Vec<&str> = sw.outgoing.iter().map(|&id| roster.name(id)).collect();
            let inc: Vec<&str> = sw.incoming.iter().map(|&id| roster.name(id)).collect();
            println!(
                "      round {} [{}]: {} ⇄ {} ({} → {})",
                sw.round,
                sw.objective,
                out.join("+"),
                inc.join("+"),
                sw.penalty_before,
                sw.penalty_after
            );
        }
    }
}

#[derive(Serialize)]
struct SectionListing<'a> {
    label: &'a str,
    students: Vec<&'a str>,
}

#[derive(Serialize)]
struct Summary<'a> {
    selected: Option<&'a Scenario>,
    sections: Vec<SectionListing<'a>>,
    metrics: Option<BalanceMetrics>,
    ranking: Vec<(String, u32)>,
    tiers: &'a [TierReport],
}

pub fn write_json_summary(
    path: &str,
    run: &PipelineRun,
    scorer: &Scorer,
    labels: &[String],
) -> CfResult<()> {
    let best = run.selected();
    let sections = match best {
        Some(s) => labels
            .iter()
            .enumerate()
            .map(|(sec, label)| SectionListing {
                label,
                students: s
                    .assignment
                    .members(sec)
                    .into_iter()
                    .map(|id| scorer.roster.name(id))
                    .collect(),
            })
            .collect(),
        None => Vec::new(),
    };

    let summary = Summary {
        selected: best,
        sections,
        metrics: best.map(|s| scorer.metrics(&s.assignment)),
        ranking: run.ranked.iter().map(|s| (s.label(), s.total())).collect(),
        tiers: &run.reports,
    };
    fs::write(path, serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}
