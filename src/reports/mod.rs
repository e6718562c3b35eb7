use cohortforge::result::{GroupingResult, SweepStats, TrendLog, TuningStats};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_right_from(table: &mut Table, first: usize, last: usize) {
    for i in first..=last {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

/// Header lines plus one row per group with `mean ± std` for every scored parameter.
pub fn print_result(result: &GroupingResult) {
    println!("\nID: {}", result.id);
    if let Some(parent) = &result.parent_id {
        println!("Parent: {}", parent);
    }
    println!("Origin: {}", result.origin);
    println!("Score: {:.6}", result.score);

    let params: Vec<String> = result
        .inputs
        .cohort
        .numeric_columns()
        .into_iter()
        .filter(|p| result.groups.iter().any(|g| g.stats.contains_key(p)))
        .collect();

    let mut table = new_table();
    let mut header = vec![
        Cell::new("Group").add_attribute(Attribute::Bold),
        Cell::new("Cage"),
        Cell::new("N"),
    ];
    header.extend(params.iter().map(|p| Cell::new(p).fg(Color::Cyan)));
    table.add_row(header);
    align_right_from(&mut table, 2, 2 + params.len());

    for g in &result.groups {
        let mut row = vec![
            Cell::new(&g.name).add_attribute(Attribute::Bold),
            Cell::new(g.cage.as_deref().unwrap_or("-")),
            Cell::new(g.size),
        ];
        row.extend(params.iter().map(|p| match g.stats.get(p.as_str()) {
            Some(s) => Cell::new(format!("{:.2} ± {:.2}", s.mean, s.std)),
            None => Cell::new("-"),
        }));
        table.add_row(row);
    }
    println!("{}", table);
}

pub fn print_assignment(result: &GroupingResult) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Subject").add_attribute(Attribute::Bold),
        Cell::new("Group"),
    ]);
    for (subject, group) in result.assignment() {
        table.add_row(vec![Cell::new(subject), Cell::new(group)]);
    }
    println!("\n{}", table);
}

pub fn print_trial_scores(scores: &[f64]) {
    if scores.is_empty() {
        return;
    }
    let best = scores.iter().copied().fold(f64::INFINITY, f64::min);

    let mut table = new_table();
    table.add_row(vec![Cell::new("Trial").add_attribute(Attribute::Bold), Cell::new("Score")]);
    align_right_from(&mut table, 0, 1);
    for (i, &s) in scores.iter().enumerate() {
        let cell = Cell::new(format!("{:.6}", s));
        let cell = if s == best { cell.fg(Color::Green) } else { cell };
        table.add_row(vec![Cell::new(i + 1), cell]);
    }
    println!("\n{}", table);
}

/// `step_label` names the first column: simulation step or sample size.
pub fn print_trend(trend: &TrendLog, step_label: &str) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new(step_label).add_attribute(Attribute::Bold),
        Cell::new("Score"),
    ]);
    align_right_from(&mut table, 0, 1);

    // Long basic-tuner logs are thinned to about 20 rows; the last step is always shown.
    let stride = (trend.len() / 20).max(1);
    let last = trend.len().saturating_sub(1);
    for (i, e) in trend.entries().iter().enumerate() {
        if i % stride == 0 || i == last {
            table.add_row(vec![Cell::new(e.step), Cell::new(format!("{:.6}", e.score))]);
        }
    }
    println!("\n{}", table);
}

pub fn print_tuning_stats(stats: &TuningStats) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Original").add_attribute(Attribute::Bold),
        Cell::new("Final"),
        Cell::new("Improvement").fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new(format!("{:.6}", stats.original_variance)),
        Cell::new(format!("{:.6}", stats.final_variance)),
        Cell::new(format!("{:.6}", stats.improvement)).fg(Color::Green),
    ]);
    println!("\n{}", table);
}

pub fn print_sweep_stats(stats: &SweepStats) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Best sample size").add_attribute(Attribute::Bold),
        Cell::new("Original"),
        Cell::new("Min"),
        Cell::new("Improvement").fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new(stats.best_sample_size),
        Cell::new(format!("{:.6}", stats.original_variance)),
        Cell::new(format!("{:.6}", stats.min_variance)),
        Cell::new(format!("{:.6}", stats.improvement)).fg(Color::Green),
    ]);
    println!("\n{}", table);
}
